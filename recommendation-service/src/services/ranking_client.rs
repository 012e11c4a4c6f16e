//! HTTP client for the similarity ranking backend
//!
//! The backend receives the query vector and all candidate vectors,
//! applies the similarity floor and top-K truncation itself, and
//! returns the survivors in descending-similarity order. This client
//! only shapes the request and unmarshals the response; rank is
//! re-assigned as the 1-based position in the returned order.

use crate::error::{AppError, Result};
use crate::models::{CandidateVector, RankedBatch, RankedConversation};
use crate::services::RankingBackend;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RecommendRequest {
    user_vector: Vec<f32>,
    conversation_vectors: Vec<ConversationVectorDto>,
    top_k: usize,
    min_similarity: f32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ConversationVectorDto {
    id: Uuid,
    vector: Vec<f32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecommendResponse {
    #[serde(default)]
    recommendations: Vec<RecommendedItemDto>,
    #[serde(default)]
    total_processed: i64,
    #[serde(default)]
    processing_time_ms: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecommendedItemDto {
    conversation_id: Uuid,
    similarity: f32,
}

pub struct RankingClient {
    http: reqwest::Client,
    base_url: String,
}

impl RankingClient {
    pub fn new(base_url: String, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { http, base_url })
    }

    fn classify(err: reqwest::Error) -> AppError {
        if err.is_timeout() {
            AppError::AiTimeout(err.to_string())
        } else {
            AppError::AiUnavailable(err.to_string())
        }
    }
}

#[async_trait]
impl RankingBackend for RankingClient {
    async fn rank(
        &self,
        user_vector: Vec<f32>,
        candidates: Vec<CandidateVector>,
        top_k: usize,
        min_similarity: f32,
    ) -> Result<RankedBatch> {
        let request = RecommendRequest {
            user_vector,
            conversation_vectors: candidates
                .into_iter()
                .map(|c| ConversationVectorDto {
                    id: c.id,
                    vector: c.vector,
                })
                .collect(),
            top_k,
            min_similarity,
        };

        debug!(
            candidates = request.conversation_vectors.len(),
            top_k, min_similarity, "Calling similarity backend /recommend"
        );

        let response = self
            .http
            .post(format!("{}/recommend", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(Self::classify)?;

        let response = response.error_for_status().map_err(|e| {
            warn!(status = ?e.status(), "Similarity backend returned error status");
            AppError::AiUnavailable(e.to_string())
        })?;

        let body: RecommendResponse = response
            .json()
            .await
            .map_err(|e| AppError::AiUnavailable(format!("Invalid ranking response: {}", e)))?;

        let items = body
            .recommendations
            .into_iter()
            .enumerate()
            .map(|(idx, item)| RankedConversation {
                conversation_id: item.conversation_id,
                similarity: item.similarity,
                rank: idx as i32 + 1,
            })
            .collect();

        Ok(RankedBatch {
            items,
            total_processed: body.total_processed,
            processing_time_ms: body.processing_time_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_payload_carries_parameters_verbatim() {
        let request = RecommendRequest {
            user_vector: vec![0.1, 0.2],
            conversation_vectors: vec![ConversationVectorDto {
                id: Uuid::parse_str("550e8400-e29b-41d4-a716-446655440000").unwrap(),
                vector: vec![0.3, 0.4],
            }],
            top_k: 10,
            min_similarity: 0.3,
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["minSimilarity"], serde_json::json!(0.3));
        assert_eq!(json["topK"], serde_json::json!(10));
        assert_eq!(json["userVector"].as_array().unwrap().len(), 2);
        assert_eq!(
            json["conversationVectors"][0]["id"],
            serde_json::json!("550e8400-e29b-41d4-a716-446655440000")
        );
    }

    #[test]
    fn test_response_rank_is_positional() {
        let body: RecommendResponse = serde_json::from_value(serde_json::json!({
            "recommendations": [
                {"conversationId": "550e8400-e29b-41d4-a716-446655440000", "similarity": 0.9},
                {"conversationId": "660e8400-e29b-41d4-a716-446655440001", "similarity": 0.5}
            ],
            "totalProcessed": 2,
            "processingTimeMs": 4.2
        }))
        .unwrap();

        let items: Vec<RankedConversation> = body
            .recommendations
            .into_iter()
            .enumerate()
            .map(|(idx, item)| RankedConversation {
                conversation_id: item.conversation_id,
                similarity: item.similarity,
                rank: idx as i32 + 1,
            })
            .collect();

        assert_eq!(items[0].rank, 1);
        assert_eq!(items[1].rank, 2);
    }

    #[test]
    fn test_empty_response_defaults() {
        let body: RecommendResponse = serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(body.recommendations.is_empty());
        assert_eq!(body.total_processed, 0);
    }
}
