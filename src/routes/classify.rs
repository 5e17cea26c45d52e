use actix_web::{http::StatusCode, web, HttpRequest, HttpResponse, Responder};
use crate::core::ClassificationHandler;
use crate::models::{HealthResponse, InvocationContext};
use std::sync::Arc;

/// Headers checked, in order, for the caller's request id
const REQUEST_ID_HEADERS: [&str; 2] = ["x-request-id", "x-amzn-requestid"];

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub handler: Arc<ClassificationHandler>,
}

/// Configure classification routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/health", web::get().to(health_check))
        .route("/classify", web::post().to(classify));
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    // Check audit sink health
    let audit = state.handler.audit();
    let status = if audit.is_healthy().await { "healthy" } else { "degraded" };

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
        cached_models: state.handler.cache().cached_models().await,
        audit_enabled: audit.is_enabled(),
    })
}

/// Classify text endpoint
///
/// POST /api/v1/classify
///
/// Request body:
/// ```json
/// { "text": "string" }
/// ```
///
/// The body is taken as raw bytes so malformed JSON is reported by the
/// handler rather than by the extractor.
async fn classify(
    state: web::Data<AppState>,
    body: web::Bytes,
    req: HttpRequest,
) -> impl Responder {
    let ctx = InvocationContext {
        request_id: request_id(&req),
    };

    let response = state.handler.handle(&body, &ctx).await;

    HttpResponse::build(StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR))
        .content_type("application/json")
        .body(response.body_json())
}

fn request_id(req: &HttpRequest) -> Option<String> {
    REQUEST_ID_HEADERS.iter().find_map(|name| {
        req.headers()
            .get(*name)
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.is_empty())
            .map(String::from)
    })
}
