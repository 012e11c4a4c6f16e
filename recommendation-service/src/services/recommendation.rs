//! Recommendation orchestrator
//!
//! Entry point for conversation recommendations: resolves or computes
//! the user's profile vector and every candidate conversation's
//! vector, ships them to the similarity backend, joins the ranked ids
//! back to conversation metadata, and caches the assembled response.
//!
//! Vector resolution is get-or-compute: the persisted store is
//! consulted first, and a freshly computed vector is handed to the
//! write-back queue instead of being awaited, so the response never
//! waits on persistence.

use crate::error::{AppError, Result};
use crate::models::{
    model_version, CandidateVector, ConversationCandidate, ConversationRecommendation,
    NewConversationVector, NewProfileVector, RecommendationsResponse, VECTOR_DIM,
};
use crate::services::{
    behavior, encoder, BehaviorSource, ConversationCatalog, ConversationVectors,
    PendingVectorWrite, RankingBackend, ResponseCache, UserVectors, VectorWriteQueue,
};
use hub_cache::CacheKey;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

pub const DEFAULT_TOP_K: usize = 10;
pub const DEFAULT_MIN_SIMILARITY: f32 = 0.3;

pub struct RecommendationEngine {
    behavior: Arc<dyn BehaviorSource>,
    catalog: Arc<dyn ConversationCatalog>,
    user_vectors: Arc<dyn UserVectors>,
    conversation_vectors: Arc<dyn ConversationVectors>,
    ranking: Arc<dyn RankingBackend>,
    cache: Arc<dyn ResponseCache>,
    write_queue: VectorWriteQueue,
}

impl RecommendationEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        behavior: Arc<dyn BehaviorSource>,
        catalog: Arc<dyn ConversationCatalog>,
        user_vectors: Arc<dyn UserVectors>,
        conversation_vectors: Arc<dyn ConversationVectors>,
        ranking: Arc<dyn RankingBackend>,
        cache: Arc<dyn ResponseCache>,
        write_queue: VectorWriteQueue,
    ) -> Self {
        Self {
            behavior,
            catalog,
            user_vectors,
            conversation_vectors,
            ranking,
            cache,
            write_queue,
        }
    }

    pub async fn get_recommendations(
        &self,
        user_id: Uuid,
        top_k: Option<usize>,
        min_similarity: Option<f32>,
    ) -> Result<RecommendationsResponse> {
        let top_k = top_k.unwrap_or(DEFAULT_TOP_K);
        let min_similarity = min_similarity.unwrap_or(DEFAULT_MIN_SIMILARITY);

        let cache_key = CacheKey::recommendations(user_id, top_k, min_similarity);
        if let Some(cached) = self.cache.get_response(&cache_key).await {
            debug!(user_id = %user_id, "Returning cached recommendations");
            return Ok(cached);
        }

        let user_vector = self.resolve_user_vector(user_id).await?;

        let candidates = self.catalog.active_candidates(user_id).await?;
        info!(
            user_id = %user_id,
            candidates = candidates.len(),
            "Loaded candidate conversations"
        );

        if candidates.is_empty() {
            return Ok(RecommendationsResponse::default());
        }

        let mut candidate_vectors = Vec::with_capacity(candidates.len());
        for candidate in &candidates {
            let vector = self.resolve_conversation_vector(candidate).await?;
            candidate_vectors.push(CandidateVector {
                id: candidate.id,
                vector,
            });
        }

        let batch = self
            .ranking
            .rank(user_vector, candidate_vectors, top_k, min_similarity)
            .await?;

        let candidate_map: HashMap<Uuid, &ConversationCandidate> =
            candidates.iter().map(|c| (c.id, c)).collect();

        // Ranked ids not in the candidate map were removed between the
        // candidate load and the ranking response; drop them silently.
        let recommendations = batch
            .items
            .into_iter()
            .filter_map(|ranked| {
                candidate_map
                    .get(&ranked.conversation_id)
                    .map(|candidate| ConversationRecommendation {
                        conversation_id: ranked.conversation_id,
                        conversation_name: candidate.name.clone(),
                        similarity: ranked.similarity,
                        rank: ranked.rank,
                        subject: candidate.subject.clone(),
                        tags: candidate.tags.clone(),
                        avatar_url: candidate.avatar_url.clone(),
                        member_count: candidate.member_count,
                        // The candidate set excludes the user's own
                        // conversations, so this is false here; the
                        // field stays for DTO parity with other
                        // conversation endpoints.
                        is_current_user_member: false,
                        has_pending_join_request: candidate.has_pending_join_request,
                    })
            })
            .collect();

        let response = RecommendationsResponse {
            recommendations,
            total_processed: batch.total_processed,
            processing_time_ms: batch.processing_time_ms,
        };

        self.cache.set_response(&cache_key, &response).await;
        Ok(response)
    }

    async fn resolve_user_vector(&self, user_id: Uuid) -> Result<Vec<f32>> {
        if let Some(vector) = self
            .user_vectors
            .latest_active(user_id, model_version::HASH_V1, VECTOR_DIM)
            .await?
        {
            return Ok(vector);
        }

        let activity = self
            .behavior
            .user_activity(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))?;

        let vector = encoder::encode_user_vector(&behavior::aggregate(&activity));
        self.write_queue
            .enqueue(PendingVectorWrite::User(NewProfileVector::hash_encoded(
                user_id,
                vector.clone(),
            )));

        Ok(vector)
    }

    async fn resolve_conversation_vector(
        &self,
        candidate: &ConversationCandidate,
    ) -> Result<Vec<f32>> {
        if let Some(vector) = self
            .conversation_vectors
            .latest_active(candidate.id, model_version::HASH_V1, VECTOR_DIM)
            .await?
        {
            return Ok(vector);
        }

        let tag_ids: Vec<Uuid> = candidate.tags.iter().map(|t| t.id).collect();
        let vector = encoder::encode_conversation_vector(&candidate.faculty_ids, &tag_ids);
        self.write_queue.enqueue(PendingVectorWrite::Conversation(
            NewConversationVector::hash_encoded(candidate.id, candidate.subject_id, vector.clone()),
        ));

        Ok(vector)
    }
}
