//! Recommendation engine services
//!
//! The orchestrator and maintenance paths talk to their collaborators
//! through the traits below so that persistence, the cache, and the
//! remote AI backend can be swapped for mocks in tests.

pub mod behavior;
pub mod embedding_client;
pub mod encoder;
pub mod maintenance;
pub mod ranking_client;
pub mod recommendation;
pub mod write_back;

pub use embedding_client::EmbeddingClient;
pub use maintenance::VectorMaintenance;
pub use ranking_client::RankingClient;
pub use recommendation::RecommendationEngine;
pub use write_back::{PendingVectorWrite, VectorWriteQueue};

use crate::error::Result;
use crate::models::{
    CandidateVector, ConversationCandidate, ConversationFeatures, ConversationTextData,
    NewConversationVector, NewProfileVector, RankedBatch, RecommendationsResponse, UserActivity,
    UserBehaviorTextData,
};
use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use uuid::Uuid;

/// Read access to raw user activity and conversation features
#[cfg_attr(test, automock)]
#[async_trait]
pub trait BehaviorSource: Send + Sync {
    /// Raw activity for an existing, non-deleted user; `None` when the
    /// user id does not resolve.
    async fn user_activity(&self, user_id: Uuid) -> Result<Option<UserActivity>>;

    /// Text-valued behavior signals for the embedding path
    async fn user_behavior_text(&self, user_id: Uuid) -> Result<Option<UserBehaviorTextData>>;

    /// Faculty and tag ids of a live conversation
    async fn conversation_features(
        &self,
        conversation_id: Uuid,
    ) -> Result<Option<(Option<Uuid>, ConversationFeatures)>>;

    /// Display text of a live conversation for the embedding path
    async fn conversation_text(&self, conversation_id: Uuid)
        -> Result<Option<ConversationTextData>>;

    /// Ids of all non-deleted users (periodic rebuild)
    async fn active_user_ids(&self) -> Result<Vec<Uuid>>;

    /// Ids of all non-deleted conversations (periodic rebuild)
    async fn live_conversation_ids(&self) -> Result<Vec<Uuid>>;
}

/// Candidate listing for the orchestrator
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ConversationCatalog: Send + Sync {
    /// Active, non-deleted conversations the user is not an active
    /// member of, with display metadata and encoder features.
    async fn active_candidates(&self, user_id: Uuid) -> Result<Vec<ConversationCandidate>>;
}

/// Versioned store of user profile vectors
#[cfg_attr(test, automock)]
#[async_trait]
pub trait UserVectors: Send + Sync {
    /// Most recent active vector for the given strategy version, or
    /// `None` on absence, parse failure, or dimension mismatch.
    async fn latest_active(
        &self,
        user_id: Uuid,
        model_version: &str,
        expected_dim: usize,
    ) -> Result<Option<Vec<f32>>>;

    /// Append a new vector version
    async fn insert(&self, vector: NewProfileVector) -> Result<()>;
}

/// Versioned store of conversation vectors
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ConversationVectors: Send + Sync {
    async fn latest_active(
        &self,
        conversation_id: Uuid,
        model_version: &str,
        expected_dim: usize,
    ) -> Result<Option<Vec<f32>>>;

    async fn insert(&self, vector: NewConversationVector) -> Result<()>;
}

/// Remote similarity ranking backend
#[cfg_attr(test, automock)]
#[async_trait]
pub trait RankingBackend: Send + Sync {
    /// Ship the query vector and candidates to the backend. The
    /// backend applies the similarity floor, truncates to `top_k` and
    /// returns descending-similarity order; this call only shapes the
    /// request and unmarshals the response.
    async fn rank(
        &self,
        user_vector: Vec<f32>,
        candidates: Vec<CandidateVector>,
        top_k: usize,
        min_similarity: f32,
    ) -> Result<RankedBatch>;
}

/// Remote text-embedding backend. Failures degrade to a zero vector of
/// the expected dimension instead of propagating.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait EmbeddingBackend: Send + Sync {
    async fn user_vector(&self, behavior: &UserBehaviorTextData) -> Vec<f32>;

    async fn conversation_vector(&self, text: &ConversationTextData) -> Vec<f32>;

    /// Dimension of the vectors this backend produces
    fn dimension(&self) -> usize;
}

/// Response cache for assembled recommendation payloads. Cache
/// failures only affect freshness, so implementations log and swallow
/// them rather than surfacing errors.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ResponseCache: Send + Sync {
    async fn get_response(&self, key: &str) -> Option<RecommendationsResponse>;

    async fn set_response(&self, key: &str, response: &RecommendationsResponse);

    /// Delete every key matching the glob pattern, returning how many
    /// entries were dropped.
    async fn invalidate_pattern(&self, pattern: &str) -> usize;
}
