use actix_web::{web, HttpResponse, Responder};
use validator::Validate;
use crate::models::{ErrorResponse, HealthResponse, MatchRequest, MatchResponse};
use crate::routes::AppState;

/// Configure match-related routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/", web::get().to(home))
        .route("/health", web::get().to(health_check))
        .route("/match", web::post().to(find_matches));
}

async fn home() -> impl Responder {
    HttpResponse::Ok()
        .content_type("text/plain; charset=utf-8")
        .body("New Leaf API is live!")
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
        locations: state.table.len(),
    })
}

/// Rank cities for a set of preferences
///
/// POST /match
///
/// Request body, structured:
/// ```json
/// {
///   "importances": {"walkability": 6, "density": 4},
///   "targets": {"density": 3},
///   "resultCount": 5,
///   "includeAvoid": true
/// }
/// ```
///
/// or the questionnaire's positional form:
/// ```json
/// { "answers": [8, 2, 4, 0, 8, 6, 3, 4, 6, 2, 5, true] }
/// ```
async fn find_matches(
    state: web::Data<AppState>,
    req: web::Json<MatchRequest>,
) -> impl Responder {
    let req = req.into_inner();

    if let MatchRequest::Structured(ref structured) = req {
        if let Err(errors) = structured.validate() {
            tracing::info!("Validation failed for match request: field_errors={:?}", errors);
            return bad_request(errors.to_string());
        }
    }

    let preferences = match req.into_preferences(&state.limits) {
        Ok(preferences) => preferences,
        Err(e) => {
            tracing::info!("Rejected match request: {}", e);
            return bad_request(e.to_string());
        }
    };

    match state.ranker.rank(&state.table, &preferences) {
        Ok(result) => {
            tracing::info!(
                "Returning {} matches and {} to avoid (from {} locations)",
                result.good.len(),
                result.avoid.len(),
                result.total_records
            );
            HttpResponse::Ok().json(MatchResponse::from(result))
        }
        Err(e) if e.is_recoverable() => {
            tracing::info!("Rejected match request: {}", e);
            bad_request(e.to_string())
        }
        Err(e) => {
            tracing::error!("Ranking failed on table integrity: {}", e);
            HttpResponse::InternalServerError().json(ErrorResponse {
                error: "Internal error".to_string(),
                message: e.to_string(),
                status_code: 500,
            })
        }
    }
}

fn bad_request(message: String) -> HttpResponse {
    HttpResponse::BadRequest().json(ErrorResponse {
        error: "Validation failed".to_string(),
        message,
        status_code: 400,
    })
}
