//! Append-only vector stores
//!
//! Every recalculation inserts a new row; readers take the most recent
//! active row for the requested strategy version. A row that fails to
//! parse or carries the wrong dimension is treated as a miss so the
//! caller recomputes instead of serving a stale shape.

use crate::error::{AppError, Result};
use crate::models::{NewConversationVector, NewProfileVector};
use crate::services::{ConversationVectors, UserVectors};
use async_trait::async_trait;
use sqlx::{PgPool, Row};
use tracing::warn;
use uuid::Uuid;

pub struct PgProfileVectorStore {
    pool: PgPool,
}

impl PgProfileVectorStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

pub struct PgConversationVectorStore {
    pool: PgPool,
}

impl PgConversationVectorStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Decode a stored embedding, rejecting malformed JSON and dimension
/// mismatches.
fn parse_embedding(json: &str, expected_dim: usize) -> Option<Vec<f32>> {
    match serde_json::from_str::<Vec<f32>>(json) {
        Ok(vector) if vector.len() == expected_dim => Some(vector),
        Ok(vector) => {
            warn!(
                stored = vector.len(),
                expected = expected_dim,
                "Stored vector has wrong dimension, treating as miss"
            );
            None
        }
        Err(e) => {
            warn!(error = %e, "Stored vector failed to parse, treating as miss");
            None
        }
    }
}

fn encode_embedding(vector: &[f32]) -> Result<String> {
    serde_json::to_string(vector)
        .map_err(|e| AppError::Internal(format!("Failed to serialize vector: {}", e)))
}

#[async_trait]
impl UserVectors for PgProfileVectorStore {
    async fn latest_active(
        &self,
        user_id: Uuid,
        model_version: &str,
        expected_dim: usize,
    ) -> Result<Option<Vec<f32>>> {
        let row = sqlx::query(
            r#"
            SELECT embedding_json
            FROM profile_vectors
            WHERE user_id = $1 AND model_version = $2 AND is_active
            ORDER BY calculated_at DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .bind(model_version)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.and_then(|r| parse_embedding(&r.get::<String, _>("embedding_json"), expected_dim)))
    }

    async fn insert(&self, vector: NewProfileVector) -> Result<()> {
        let embedding_json = encode_embedding(&vector.embedding)?;

        sqlx::query(
            r#"
            INSERT INTO profile_vectors
                (id, user_id, vector_type, dimension, embedding_json,
                 metric, model_version, calculated_at, is_active)
            VALUES ($1, $2, $3, $4, $5, $6, $7, NOW(), TRUE)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(vector.user_id)
        .bind(vector.vector_type.as_str())
        .bind(vector.dimension as i32)
        .bind(embedding_json)
        .bind(vector.metric)
        .bind(vector.model_version)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl ConversationVectors for PgConversationVectorStore {
    async fn latest_active(
        &self,
        conversation_id: Uuid,
        model_version: &str,
        expected_dim: usize,
    ) -> Result<Option<Vec<f32>>> {
        let row = sqlx::query(
            r#"
            SELECT embedding_json
            FROM conversation_vectors
            WHERE conversation_id = $1 AND model_version = $2 AND is_active
            ORDER BY calculated_at DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(conversation_id)
        .bind(model_version)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.and_then(|r| parse_embedding(&r.get::<String, _>("embedding_json"), expected_dim)))
    }

    async fn insert(&self, vector: NewConversationVector) -> Result<()> {
        let embedding_json = encode_embedding(&vector.embedding)?;

        sqlx::query(
            r#"
            INSERT INTO conversation_vectors
                (id, conversation_id, subject_id, vector_type, dimension,
                 embedding_json, metric, model_version, calculated_at, is_active)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, NOW(), TRUE)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(vector.conversation_id)
        .bind(vector.subject_id)
        .bind(vector.vector_type.as_str())
        .bind(vector.dimension as i32)
        .bind(embedding_json)
        .bind(vector.metric)
        .bind(vector.model_version)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
