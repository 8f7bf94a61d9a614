use actix_web::{http::StatusCode, web, HttpResponse, Responder};
use validator::Validate;
use crate::models::{DescribeRequest, ErrorResponse};
use crate::routes::AppState;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/describe", web::post().to(describe));
}

/// Turn a free-text description into preference scores
///
/// POST /describe
///
/// Request body:
/// ```json
/// { "description": "Somewhere walkable and affordable near the coast" }
/// ```
async fn describe(
    state: web::Data<AppState>,
    req: web::Json<DescribeRequest>,
) -> impl Responder {
    let Some(describer) = state.describer.as_ref() else {
        return HttpResponse::NotFound().json(ErrorResponse {
            error: "Describe unavailable".to_string(),
            message: "The describe endpoint is not configured".to_string(),
            status_code: 404,
        });
    };

    if let Err(errors) = req.validate() {
        return HttpResponse::BadRequest().json(ErrorResponse {
            error: "Validation failed".to_string(),
            message: errors.to_string(),
            status_code: 400,
        });
    }

    match describer.describe(&req.description).await {
        Ok(response) => HttpResponse::Ok().json(response),
        Err(e) => {
            if e.status_code() >= 500 {
                tracing::error!("Describe request failed: {}", e);
            } else {
                tracing::info!("Describe request rejected: {}", e);
            }

            let status = StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::BAD_GATEWAY);
            HttpResponse::build(status).json(ErrorResponse {
                error: status.canonical_reason().unwrap_or("Error").to_string(),
                message: e.client_message(),
                status_code: status.as_u16(),
            })
        }
    }
}
