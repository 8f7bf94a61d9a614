use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use new_leaf::config::{LoggingSettings, Settings};
use new_leaf::core::Ranker;
use new_leaf::routes::{self, handle_json_payload_error, AppState};
use new_leaf::services::{DatasetLoader, Describer};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

fn init_logging(logging: &LoggingSettings) {
    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true);

    if logging.format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.init();
    }
}

fn fatal(message: String) -> std::io::Error {
    error!("{}", message);
    std::io::Error::other(message)
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    let settings = match Settings::load() {
        Ok(settings) => settings,
        Err(e) => {
            init_logging(&LoggingSettings::default());
            return Err(fatal(format!("Failed to load configuration: {}", e)));
        }
    };

    init_logging(&settings.logging);
    info!("Starting New Leaf matching service...");

    let catalogue = settings
        .scoring
        .catalogue()
        .map_err(|e| fatal(format!("Invalid attribute configuration: {}", e)))?;
    let limits = settings
        .scoring
        .limits()
        .map_err(|e| fatal(format!("Invalid scoring configuration: {}", e)))?;

    info!("Scoring {} attributes: {:?}", catalogue.len(), catalogue.iter().map(|a| &a.key).collect::<Vec<_>>());

    // The table must be loaded and valid before the server accepts requests
    let loader = DatasetLoader::from_settings(&settings.dataset, Arc::new(catalogue))
        .map_err(|e| fatal(format!("Invalid dataset configuration: {}", e)))?;
    let table = loader
        .load()
        .await
        .map_err(|e| fatal(format!("Failed to load dataset: {}", e)))?;

    let describer = if !settings.describe.enabled {
        info!("Describe endpoint disabled");
        None
    } else if settings.describe.api_key.is_empty() {
        warn!("No model API key configured (OPENAI_API_KEY), describe endpoint disabled");
        None
    } else {
        let describer = Describer::new(&settings.describe)
            .map_err(|e| fatal(format!("Failed to build describe client: {}", e)))?;
        info!("Describe endpoint enabled (model: {})", settings.describe.model);
        Some(Arc::new(describer))
    };

    let app_state = AppState {
        table: Arc::new(table),
        ranker: Ranker::new(limits.importance_scale),
        limits,
        describer,
    };

    // Configure HTTP server
    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);

    info!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::JsonConfig::default().error_handler(handle_json_payload_error))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .configure(routes::configure_routes)
    })
    .workers(workers)
    .bind((host, port))?
    .run()
    .await
}
