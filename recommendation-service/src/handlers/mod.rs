//! Recommendation API handlers
//!
//! HTTP endpoints for conversation recommendations plus the internal
//! vector refresh hooks other services call on user activity.

use actix_web::{get, post, web, HttpRequest, HttpResponse};
use prometheus::{Encoder, TextEncoder};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::middleware::UserId;
use crate::services::{RecommendationEngine, VectorMaintenance};

const MAX_TOP_K: usize = 100;

/// Query parameters for GET /api/v1/conversations/recommendations
#[derive(Debug, Deserialize)]
pub struct RecommendationQuery {
    pub top_k: Option<usize>,
    pub min_similarity: Option<f32>,
}

/// Handler state shared across routes
pub struct AppState {
    pub engine: Arc<RecommendationEngine>,
    pub maintenance: Arc<VectorMaintenance>,
}

/// GET /api/v1/conversations/recommendations
/// Ranked conversation recommendations for the authenticated user.
/// Registered under a JWT-wrapped scope in main.
#[get("/recommendations")]
pub async fn get_conversation_recommendations(
    user_id: UserId,
    query: web::Query<RecommendationQuery>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    if let Some(min_similarity) = query.min_similarity {
        if !(0.0..=1.0).contains(&min_similarity) {
            return Err(AppError::Validation(
                "min_similarity must be between 0 and 1".to_string(),
            ));
        }
    }
    let top_k = query.top_k.map(|k| k.clamp(1, MAX_TOP_K));

    debug!(
        user_id = %user_id.0,
        top_k = ?top_k,
        min_similarity = ?query.min_similarity,
        "Getting conversation recommendations"
    );

    match state
        .engine
        .get_recommendations(user_id.0, top_k, query.min_similarity)
        .await
    {
        Ok(response) => Ok(HttpResponse::Ok().json(response)),
        Err(err) => {
            error!(user_id = %user_id.0, "Failed to get recommendations: {:?}", err);
            Err(err)
        }
    }
}

fn require_service_token(req: &HttpRequest) -> Result<()> {
    // TODO: validate the token value once service-to-service auth
    // lands; today the gateway strips this header from external traffic
    if !req.headers().contains_key("x-service-token") {
        return Err(AppError::Authentication(
            "Missing service authentication token".to_string(),
        ));
    }
    Ok(())
}

/// POST /internal/v1/vectors/users/{user_id}/refresh
/// Called by the content service when user activity changes
#[post("/internal/v1/vectors/users/{user_id}/refresh")]
pub async fn refresh_user_vector(
    req: HttpRequest,
    path: web::Path<Uuid>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    require_service_token(&req)?;

    let user_id = path.into_inner();
    info!(user_id = %user_id, "User vector refresh requested");

    let maintenance = state.maintenance.clone();
    tokio::spawn(async move {
        maintenance.refresh_user_vector(user_id).await;
    });

    Ok(HttpResponse::Accepted().finish())
}

/// POST /internal/v1/vectors/conversations/{conversation_id}/refresh
#[post("/internal/v1/vectors/conversations/{conversation_id}/refresh")]
pub async fn refresh_conversation_vector(
    req: HttpRequest,
    path: web::Path<Uuid>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    require_service_token(&req)?;

    let conversation_id = path.into_inner();
    info!(conversation_id = %conversation_id, "Conversation vector refresh requested");

    let maintenance = state.maintenance.clone();
    tokio::spawn(async move {
        maintenance.refresh_conversation_vector(conversation_id).await;
    });

    Ok(HttpResponse::Accepted().finish())
}

/// GET /health
#[get("/health")]
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().body("OK")
}

/// GET /metrics
#[get("/metrics")]
pub async fn metrics() -> Result<HttpResponse> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| AppError::Internal(format!("Failed to encode metrics: {}", e)))?;

    Ok(HttpResponse::Ok()
        .content_type(encoder.format_type())
        .body(buffer))
}
