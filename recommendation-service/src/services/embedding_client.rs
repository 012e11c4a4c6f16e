//! HTTP client for the text-embedding backend
//!
//! Used by the maintenance path only. Failures never propagate: the
//! caller gets a zero vector of the expected dimension and the error
//! is logged, because a missed refresh must not fail the operation
//! that triggered it.

use crate::error::{AppError, Result};
use crate::models::{ConversationTextData, UserBehaviorTextData};
use crate::services::EmbeddingBackend;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

/// Dimension of the embeddings produced by the AI backend
pub const EMBEDDING_DIM: usize = 384;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UserVectorRequest {
    subjects: Vec<String>,
    subject_weights: Vec<f32>,
    tags: Vec<String>,
    tag_weights: Vec<f32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ConvVectorRequest {
    name: String,
    subject: Option<String>,
    tags: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct VectorResponse {
    vector: Vec<f32>,
    #[serde(default)]
    #[allow(dead_code)]
    dim: usize,
}

pub struct EmbeddingClient {
    http: reqwest::Client,
    base_url: String,
}

impl EmbeddingClient {
    pub fn new(base_url: String, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { http, base_url })
    }

    async fn post_vector<T: Serialize>(&self, path: &str, payload: &T) -> Result<Vec<f32>> {
        let response = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .json(payload)
            .send()
            .await
            .map_err(|e| AppError::AiUnavailable(e.to_string()))?
            .error_for_status()
            .map_err(|e| AppError::AiUnavailable(e.to_string()))?;

        let body: VectorResponse = response
            .json()
            .await
            .map_err(|e| AppError::AiUnavailable(format!("Invalid embedding response: {}", e)))?;

        Ok(body.vector)
    }
}

#[async_trait]
impl EmbeddingBackend for EmbeddingClient {
    async fn user_vector(&self, behavior: &UserBehaviorTextData) -> Vec<f32> {
        let payload = UserVectorRequest {
            subjects: behavior.subject_scores.iter().map(|s| s.name.clone()).collect(),
            subject_weights: behavior
                .subject_scores
                .iter()
                .map(|s| s.score as f32)
                .collect(),
            tags: behavior.tag_scores.iter().map(|s| s.name.clone()).collect(),
            tag_weights: behavior.tag_scores.iter().map(|s| s.score as f32).collect(),
        };

        match self.post_vector("/vector/user", &payload).await {
            Ok(vector) => vector,
            Err(e) => {
                warn!(error = %e, "Failed to embed user behavior, falling back to zero vector");
                vec![0.0; EMBEDDING_DIM]
            }
        }
    }

    async fn conversation_vector(&self, text: &ConversationTextData) -> Vec<f32> {
        let payload = ConvVectorRequest {
            name: text.name.clone(),
            subject: text.subject.clone(),
            tags: text.tags.clone(),
        };

        match self.post_vector("/vector/conv", &payload).await {
            Ok(vector) => vector,
            Err(e) => {
                warn!(error = %e, "Failed to embed conversation, falling back to zero vector");
                vec![0.0; EMBEDDING_DIM]
            }
        }
    }

    fn dimension(&self) -> usize {
        EMBEDDING_DIM
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TextScoreItem;

    #[test]
    fn test_user_payload_shape() {
        let behavior = UserBehaviorTextData {
            subject_scores: vec![TextScoreItem {
                name: "Circuit Analysis".to_string(),
                score: 5,
            }],
            tag_scores: vec![TextScoreItem {
                name: "electronics".to_string(),
                score: 2,
            }],
        };

        let payload = UserVectorRequest {
            subjects: behavior.subject_scores.iter().map(|s| s.name.clone()).collect(),
            subject_weights: behavior
                .subject_scores
                .iter()
                .map(|s| s.score as f32)
                .collect(),
            tags: behavior.tag_scores.iter().map(|s| s.name.clone()).collect(),
            tag_weights: behavior.tag_scores.iter().map(|s| s.score as f32).collect(),
        };

        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["subjects"][0], "Circuit Analysis");
        assert_eq!(json["subjectWeights"][0], 5.0);
        assert_eq!(json["tags"][0], "electronics");
        assert_eq!(json["tagWeights"][0], 2.0);
    }
}
