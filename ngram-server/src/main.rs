use std::path::{Path, PathBuf};
use std::sync::Mutex;

use actix_cors::Cors;
use actix_web::middleware::Logger;
use actix_web::{App, HttpResponse, HttpServer, Responder, get, put, web};
use env_logger::Env;
use log::{info, warn};
use ngram_core::io::{get_filename, list_files, normalize_folder};
use ngram_core::model::generation_input::GenerationInput;
use ngram_core::model::generator::Generator;
use ngram_core::model::markov_model::MarkovModel;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Deserialize;

const MODEL_EXTENSION: &str = "model";
const DEFAULT_LENGTH: usize = 8;
const MAX_LENGTH: usize = 256;
const DEFAULT_COUNT: usize = 10;
const MAX_COUNT: usize = 10_000;
const DEFAULT_PRUNE: f64 = 0.07;

/// Struct representing query parameters for the `/v1/generate` endpoint
#[derive(Deserialize)]
struct GenerateParams {
	length: Option<usize>,
	count: Option<usize>,
	prune: Option<f64>,
	mutation: Option<f64>,
	ascii_only: Option<bool>,
	seed: Option<u64>,
}

#[derive(Deserialize)]
struct ModelQuery {
	name: Option<String>,
}

struct SharedData {
	models_dir: PathBuf,
	model: Option<MarkovModel>,
	name: Option<String>,
}

impl SharedData {
	fn new(models_dir: PathBuf) -> Self {
		Self { models_dir, model: None, name: None }
	}
}

impl GenerateParams {
	/// Builds the generation input, rejecting out-of-range values.
	fn generation_input(&self) -> Result<GenerationInput, String> {
		let length = self.length.unwrap_or(DEFAULT_LENGTH);
		if length == 0 || length > MAX_LENGTH {
			return Err(format!("length must be between 1 and {MAX_LENGTH}"));
		}

		let mut input = GenerationInput::new(length);
		input.ascii_only = self.ascii_only.unwrap_or(true);
		let prune = self.prune.unwrap_or(DEFAULT_PRUNE);
		input.set_prune_threshold((prune > 0.0).then_some(prune)).map_err(|e| e.to_string())?;
		input.set_mutation_rate(self.mutation.unwrap_or(0.0)).map_err(|e| e.to_string())?;
		Ok(input)
	}

	fn count(&self) -> Result<usize, String> {
		match self.count.unwrap_or(DEFAULT_COUNT) {
			count @ 1..=MAX_COUNT => Ok(count),
			_ => Err(format!("count must be between 1 and {MAX_COUNT}")),
		}
	}
}

/// Model names are plain file stems: no path separators, no parent references.
fn is_valid_model_name(name: &str) -> bool {
	!name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.')) && !name.contains("..")
}

fn model_path(dir: &Path, name: &str) -> PathBuf {
	dir.join(format!("{name}.{MODEL_EXTENSION}"))
}

/// HTTP GET endpoint `/v1/generate`
///
/// Generates `count` strings from the loaded model, one per line.
///
/// # Notes
/// - 400 on invalid parameters
/// - 409 when no model is loaded
#[get("/v1/generate")]
async fn get_generated(data: web::Data<Mutex<SharedData>>, query: web::Query<GenerateParams>) -> impl Responder {
	let input = match query.generation_input() {
		Ok(input) => input,
		Err(e) => return HttpResponse::BadRequest().body(e),
	};
	let count = match query.count() {
		Ok(count) => count,
		Err(e) => return HttpResponse::BadRequest().body(e),
	};

	let shared_data = match data.lock() {
		Ok(m) => m,
		Err(_) => return HttpResponse::InternalServerError().body("Model lock failed"),
	};
	let Some(model) = &shared_data.model else {
		return HttpResponse::Conflict().body("No model loaded");
	};

	let mut rng = StdRng::seed_from_u64(query.seed.unwrap_or_else(rand::random));
	let words = Generator::new(model).generate_many(&input, count, &mut rng);
	HttpResponse::Ok().body(words.join("\n"))
}

#[get("/v1/models")]
async fn get_models(data: web::Data<Mutex<SharedData>>) -> impl Responder {
	let models_dir = match data.lock() {
		Ok(m) => m.models_dir.clone(),
		Err(_) => return HttpResponse::InternalServerError().body("Model lock failed"),
	};

	let names: Result<Vec<String>, _> = list_files(&models_dir, MODEL_EXTENSION)
		.and_then(|files| files.iter().map(get_filename).collect());
	match names {
		Ok(names) => HttpResponse::Ok().body(names.join("\n")),
		Err(e) => {
			warn!("Failed to list models in {}: {e}", models_dir.display());
			HttpResponse::InternalServerError().body("Failed to list models")
		}
	}
}

#[get("/v1/loaded_model")]
async fn get_loaded_model(data: web::Data<Mutex<SharedData>>) -> impl Responder {
	let shared_data = match data.lock() {
		Ok(m) => m,
		Err(_) => return HttpResponse::InternalServerError().body("Model lock failed"),
	};
	HttpResponse::Ok().body(shared_data.name.clone().unwrap_or_default())
}

#[put("/v1/load_model")]
async fn put_model(data: web::Data<Mutex<SharedData>>, query: web::Query<ModelQuery>) -> impl Responder {
	let name = match &query.name {
		Some(s) if is_valid_model_name(s.trim()) => s.trim(),
		_ => return HttpResponse::BadRequest().body("Missing or invalid model name"),
	};

	let mut shared_data = match data.lock() {
		Ok(m) => m,
		Err(_) => return HttpResponse::InternalServerError().body("Model lock failed"),
	};

	let path = model_path(&shared_data.models_dir, name);
	if !path.is_file() {
		return HttpResponse::NotFound().body(format!("Unknown model '{name}'"));
	}
	let model = match MarkovModel::load(&path) {
		Ok(m) => m,
		Err(e) => return HttpResponse::InternalServerError().body(format!("Failed to load model: {e}")),
	};

	info!("Loaded model '{name}' from {}", path.display());
	shared_data.model = Some(model);
	shared_data.name = Some(name.to_owned());
	HttpResponse::Ok().body("Model loaded successfully")
}

fn routes(cfg: &mut web::ServiceConfig) {
	cfg.service(get_generated).service(get_models).service(get_loaded_model).service(put_model);
}

/// Main entry point for the server.
///
/// Serves the `*.model` files of a directory (`NGRAM_MODELS_DIR`, `./models`
/// by default). No model is loaded at startup: `PUT /v1/load_model` picks one.
///
/// # Notes
/// - The server binds to 127.0.0.1:5000.
/// - `RUST_LOG` controls the log level (info by default).
#[actix_web::main]
async fn main() -> std::io::Result<()> {
	env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

	let models_dir = normalize_folder(&std::env::var("NGRAM_MODELS_DIR").unwrap_or_else(|_| "./models".to_owned()));
	info!("Serving models from {}", models_dir.display());
	let shared_model = web::Data::new(Mutex::new(SharedData::new(models_dir)));

	HttpServer::new(move || {
		App::new()
			.wrap(Logger::default())
			.wrap(Cors::default().allow_any_origin().allowed_methods(vec!["GET", "PUT"]))
			.app_data(shared_model.clone())
			.configure(routes)
	})
		.bind(("127.0.0.1", 5000))?
		.run()
		.await
}
