use actix_cors::Cors;
use actix_web::{error, http::StatusCode, middleware, web, App, HttpResponse, HttpServer};
use chatogram_engine::config::Settings;
use chatogram_engine::core::{ReputationPolicy, SelectionPolicy};
use chatogram_engine::engine::{Engine, EnginePolicy};
use chatogram_engine::routes::{self, AppState};
use chatogram_engine::services::{PostgresProfileStore, ProfileCache, WebhookNotifier};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

/// JSON error response for JSON payload errors
#[derive(Debug, serde::Serialize)]
pub struct JsonError {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}

impl std::fmt::Display for JsonError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error, self.message)
    }
}

impl std::error::Error for JsonError {}

impl error::ResponseError for JsonError {
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::BAD_REQUEST))
            .content_type("application/json")
            .body(serde_json::to_string(self).unwrap())
    }
}

/// Handle JSON payload errors
pub fn handle_json_payload_error(err: error::JsonPayloadError, req: &actix_web::HttpRequest) -> actix_web::Error {
    tracing::info!("JSON payload error on {}: {}", req.path(), err);
    JsonError {
        error: "invalid_json".to_string(),
        message: format!("Invalid JSON: {}", err),
        status_code: 400,
    }
    .into()
}

/// Build the engine tunables from configuration.
fn engine_policy(settings: &Settings) -> EnginePolicy {
    EnginePolicy {
        search_timeout: Duration::from_secs(settings.matching.search_timeout_secs),
        selection: SelectionPolicy {
            preferred_cutoff: settings.matching.preferred_cutoff,
            shadow_ban_cutoff: settings.matching.shadow_ban_cutoff,
            preferred_slice_ratio: settings.matching.preferred_slice_ratio,
            report_ban_threshold: settings.matching.report_ban_threshold,
        },
        reputation: ReputationPolicy {
            weights: settings.reputation.weights,
            meaningful_session: Duration::from_secs(settings.reputation.meaningful_session_secs),
            too_short_session: Duration::from_secs(settings.reputation.too_short_session_secs),
            rapid_skip_limit: settings.reputation.rapid_skip_limit,
            rapid_skip_window: Duration::from_secs(settings.reputation.rapid_skip_window_secs),
        },
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    // Initialize logging
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "json".to_string());

    let subscriber = tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true);

    if log_format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.init();
    }

    info!("Starting Chatogram matchmaking engine...");

    // Load configuration
    let settings = Settings::load().unwrap_or_else(|e| {
        error!("Failed to load configuration: {}", e);
        panic!("Configuration error: {}", e);
    });

    info!("Configuration loaded successfully");

    // Initialize the profile store (with L1 profile cache)
    let cache_ttl = settings.cache.ttl_secs.unwrap_or(30);
    let l1_cache_size = settings.cache.l1_cache_size.unwrap_or(10_000);
    let cache = ProfileCache::new(l1_cache_size, cache_ttl);

    let db_max_conn = settings.database.max_connections.unwrap_or(10);
    let db_min_conn = settings.database.min_connections.unwrap_or(1);

    let store = Arc::new(
        PostgresProfileStore::from_settings(
            &settings.database.url,
            Some(db_max_conn),
            Some(db_min_conn),
            cache,
        )
        .await
        .unwrap_or_else(|e| {
            error!("Failed to connect to PostgreSQL: {}", e);
            panic!("PostgreSQL connection error: {}", e);
        }),
    );

    info!(
        "Profile store initialized (max: {} connections, L1 cache: {} entries)",
        db_max_conn, l1_cache_size
    );

    // Initialize the transport webhook client
    let notifier = Arc::new(WebhookNotifier::new(
        settings.transport.webhook_url.clone(),
        settings.transport.auth_token.clone(),
        settings.transport.timeout_secs.unwrap_or(30),
    ));

    info!("Transport webhook client initialized");

    // Build the engine with configured policy
    let policy = engine_policy(&settings);
    let engine = Engine::new(Arc::clone(&store), notifier, policy);

    info!(
        "Engine initialized (search timeout: {}s)",
        settings.matching.search_timeout_secs
    );

    // Background reputation decay sweep
    let decay_interval = Duration::from_secs(settings.reputation.decay_interval_days * 86_400);
    let sweeper = engine.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(decay_interval);
        // The first tick fires immediately; skip it.
        interval.tick().await;
        loop {
            interval.tick().await;
            match sweeper.run_decay_sweep().await {
                Ok(touched) => info!("Reputation decay sweep complete ({} profiles)", touched),
                Err(e) => error!("Reputation decay sweep failed: {}", e),
            }
        }
    });

    // Build application state
    let app_state = AppState { engine, store };

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
