use actix_web::{http::StatusCode, web, HttpResponse, Responder};
use std::sync::Arc;
use validator::Validate;

use crate::engine::{Engine, EngineError, RelayOutcome, SearchOutcome};
use crate::models::{
    AckResponse, ErrorResponse, EventRequest, HealthResponse, MessagePayload, MessageRequest,
    ReconnectResponse, RelayResponse, ReportRequest, SearchMode, SearchRequest, SearchResponse,
};
use crate::services::{PostgresProfileStore, WebhookNotifier};

/// The engine as wired in production.
pub type ServiceEngine = Engine<PostgresProfileStore, WebhookNotifier>;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub engine: ServiceEngine,
    pub store: Arc<PostgresProfileStore>,
}

/// Configure all inbound event routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check))
        .route("/events/search", web::post().to(search))
        .route("/events/stop", web::post().to(stop))
        .route("/events/skip", web::post().to(skip))
        .route("/events/reconnect", web::post().to(reconnect))
        .route("/events/report", web::post().to(report))
        .route("/events/block", web::post().to(block))
        .route("/events/message", web::post().to(message));
}

/// Health check endpoint: store reachability plus live matching gauges.
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let store_healthy = state.store.health_check().await.unwrap_or(false);
    let stats = state.engine.stats().await;

    let status = if store_healthy { "healthy" } else { "degraded" };

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
        waiting: stats.waiting,
        active_sessions: stats.active_sessions,
    })
}

fn validation_error(errors: validator::ValidationErrors) -> HttpResponse {
    HttpResponse::BadRequest().json(ErrorResponse {
        error: "validation_failed".to_string(),
        message: errors.to_string(),
        status_code: 400,
    })
}

fn engine_error(err: EngineError) -> HttpResponse {
    let (status, code) = match &err {
        EngineError::AlreadyInSession(_) => (409, "already_in_session"),
        EngineError::AlreadySearching(_) => (409, "already_searching"),
        EngineError::Banned(_) => (403, "banned"),
        EngineError::PremiumRequired(_) => (403, "premium_required"),
        EngineError::NoHistory(_) => (404, "no_history"),
        EngineError::PartnerUnavailable => (409, "partner_unavailable"),
        EngineError::Blocked => (403, "blocked"),
        EngineError::Store(_) => (500, "store_unavailable"),
    };

    if status >= 500 {
        tracing::error!("engine operation failed: {}", err);
    }

    HttpResponse::build(StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR))
        .json(ErrorResponse {
            error: code.to_string(),
            message: err.to_string(),
            status_code: status,
        })
}

fn parse_mode(req: &SearchRequest) -> Result<SearchMode, HttpResponse> {
    match req.mode.to_lowercase().as_str() {
        "open" => Ok(SearchMode::Open),
        "gender" => match &req.target_gender {
            Some(target) => Ok(SearchMode::Gender { target: target.clone() }),
            None => Err(HttpResponse::BadRequest().json(ErrorResponse {
                error: "missing_target_gender".to_string(),
                message: "gender mode requires targetGender".to_string(),
                status_code: 400,
            })),
        },
        "city" => Ok(SearchMode::City),
        "interests" => Ok(SearchMode::Interests),
        _ => Err(HttpResponse::BadRequest().json(ErrorResponse {
            error: "invalid_mode".to_string(),
            message: "mode must be one of: open, gender, city, interests".to_string(),
            status_code: 400,
        })),
    }
}

fn search_response(outcome: SearchOutcome) -> HttpResponse {
    match outcome {
        SearchOutcome::Matched { session_id, .. } => HttpResponse::Ok().json(SearchResponse {
            outcome: "matched".to_string(),
            session_id: Some(session_id),
        }),
        SearchOutcome::Enqueued => HttpResponse::Ok().json(SearchResponse {
            outcome: "queued".to_string(),
            session_id: None,
        }),
    }
}

/// Search request endpoint
///
/// POST /api/v1/events/search
async fn search(state: web::Data<AppState>, req: web::Json<SearchRequest>) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_error(errors);
    }

    let mode = match parse_mode(&req) {
        Ok(mode) => mode,
        Err(response) => return response,
    };

    match state.engine.on_search(req.user_id, mode).await {
        Ok(outcome) => search_response(outcome),
        Err(err) => engine_error(err),
    }
}

/// Stop the current chat (or cancel a pending search)
///
/// POST /api/v1/events/stop
async fn stop(state: web::Data<AppState>, req: web::Json<EventRequest>) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_error(errors);
    }

    match state.engine.on_stop(req.user_id).await {
        Ok(()) => HttpResponse::Ok().json(AckResponse { success: true }),
        Err(err) => engine_error(err),
    }
}

/// Skip to the next partner
///
/// POST /api/v1/events/skip
async fn skip(state: web::Data<AppState>, req: web::Json<EventRequest>) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_error(errors);
    }

    match state.engine.on_skip(req.user_id).await {
        Ok(outcome) => search_response(outcome),
        Err(err) => engine_error(err),
    }
}

/// Reconnect with the previous partner
///
/// POST /api/v1/events/reconnect
async fn reconnect(state: web::Data<AppState>, req: web::Json<EventRequest>) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_error(errors);
    }

    match state.engine.on_reconnect(req.user_id).await {
        Ok(session_id) => HttpResponse::Ok().json(ReconnectResponse { session_id }),
        Err(err) => engine_error(err),
    }
}

/// Report the current partner
///
/// POST /api/v1/events/report
async fn report(state: web::Data<AppState>, req: web::Json<ReportRequest>) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_error(errors);
    }

    match state.engine.on_report(req.user_id, &req.reason).await {
        Ok(()) => HttpResponse::Ok().json(AckResponse { success: true }),
        Err(err) => engine_error(err),
    }
}

/// Block the current (or most recent) partner
///
/// POST /api/v1/events/block
async fn block(state: web::Data<AppState>, req: web::Json<EventRequest>) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_error(errors);
    }

    match state.engine.on_block(req.user_id).await {
        Ok(()) => HttpResponse::Ok().json(AckResponse { success: true }),
        Err(err) => engine_error(err),
    }
}

/// Relay a chat message to the current partner
///
/// POST /api/v1/events/message
async fn message(state: web::Data<AppState>, req: web::Json<MessageRequest>) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_error(errors);
    }

    let payload = MessagePayload {
        content_type: req.content_type.clone(),
        body: req.body.clone(),
    };

    match state.engine.on_message(req.user_id, &payload).await {
        Ok(outcome) => {
            let outcome = match outcome {
                RelayOutcome::Delivered => "delivered",
                RelayOutcome::NoActiveSession => "no-active-session",
                RelayOutcome::SessionClosed => "session-closed",
            };
            HttpResponse::Ok().json(RelayResponse { outcome: outcome.to_string() })
        }
        Err(err) => engine_error(err),
    }
}
