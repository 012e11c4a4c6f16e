//! Vector maintenance
//!
//! Refreshes stored vectors when the underlying behavior changes, via
//! the text-embedding strategy, and invalidates the user's cached
//! recommendations afterwards. Every step here only affects freshness,
//! so failures are logged and swallowed; callers never see an error.

use crate::models::{NewConversationVector, NewProfileVector};
use crate::services::{
    BehaviorSource, ConversationVectors, EmbeddingBackend, ResponseCache, UserVectors,
};
use hub_cache::CacheKey;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

pub struct VectorMaintenance {
    behavior: Arc<dyn BehaviorSource>,
    user_vectors: Arc<dyn UserVectors>,
    conversation_vectors: Arc<dyn ConversationVectors>,
    embedding: Arc<dyn EmbeddingBackend>,
    cache: Arc<dyn ResponseCache>,
}

impl VectorMaintenance {
    pub fn new(
        behavior: Arc<dyn BehaviorSource>,
        user_vectors: Arc<dyn UserVectors>,
        conversation_vectors: Arc<dyn ConversationVectors>,
        embedding: Arc<dyn EmbeddingBackend>,
        cache: Arc<dyn ResponseCache>,
    ) -> Self {
        Self {
            behavior,
            user_vectors,
            conversation_vectors,
            embedding,
            cache,
        }
    }

    /// Recompute and store the text-embedded vector for a user, then
    /// drop their cached recommendations.
    pub async fn refresh_user_vector(&self, user_id: Uuid) {
        let behavior = match self.behavior.user_behavior_text(user_id).await {
            Ok(Some(behavior)) => behavior,
            Ok(None) => {
                warn!(user_id = %user_id, "User not found, skipping vector refresh");
                return;
            }
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "Failed to load user behavior");
                return;
            }
        };

        let vector = self.embedding.user_vector(&behavior).await;
        if let Err(e) = self
            .user_vectors
            .insert(NewProfileVector::text_embedded(user_id, vector))
            .await
        {
            warn!(user_id = %user_id, error = %e, "Failed to store refreshed user vector");
            return;
        }

        info!(user_id = %user_id, "Refreshed user vector");
        self.invalidate_user_recommendations(user_id).await;
    }

    /// Recompute and store the text-embedded vector for a conversation.
    pub async fn refresh_conversation_vector(&self, conversation_id: Uuid) {
        let text = match self.behavior.conversation_text(conversation_id).await {
            Ok(Some(text)) => text,
            Ok(None) => {
                warn!(conversation_id = %conversation_id, "Conversation not found, skipping vector refresh");
                return;
            }
            Err(e) => {
                warn!(conversation_id = %conversation_id, error = %e, "Failed to load conversation text");
                return;
            }
        };

        let subject_id = match self.behavior.conversation_features(conversation_id).await {
            Ok(Some((subject_id, _))) => subject_id,
            Ok(None) => None,
            Err(e) => {
                warn!(conversation_id = %conversation_id, error = %e, "Failed to load conversation subject");
                None
            }
        };

        let vector = self.embedding.conversation_vector(&text).await;
        if let Err(e) = self
            .conversation_vectors
            .insert(NewConversationVector::text_embedded(
                conversation_id,
                subject_id,
                vector,
            ))
            .await
        {
            warn!(conversation_id = %conversation_id, error = %e, "Failed to store refreshed conversation vector");
            return;
        }

        info!(conversation_id = %conversation_id, "Refreshed conversation vector");
    }

    /// Drop every cached recommendation response for a user.
    pub async fn invalidate_user_recommendations(&self, user_id: Uuid) {
        let pattern = CacheKey::recommendations_pattern(user_id);
        let dropped = self.cache.invalidate_pattern(&pattern).await;
        info!(user_id = %user_id, dropped, "Invalidated cached recommendations");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::models::{model_version, TextScoreItem, UserBehaviorTextData};
    use crate::services::{
        MockBehaviorSource, MockConversationVectors, MockEmbeddingBackend, MockResponseCache,
        MockUserVectors,
    };

    fn behavior_fixture() -> UserBehaviorTextData {
        UserBehaviorTextData {
            subject_scores: vec![TextScoreItem {
                name: "Circuit Analysis".to_string(),
                score: 5,
            }],
            tag_scores: vec![],
        }
    }

    #[tokio::test]
    async fn test_refresh_stores_text_vector_and_invalidates_cache() {
        let user_id = Uuid::new_v4();

        let mut behavior = MockBehaviorSource::new();
        behavior
            .expect_user_behavior_text()
            .returning(|_| Ok(Some(behavior_fixture())));
        let mut embedding = MockEmbeddingBackend::new();
        embedding
            .expect_user_vector()
            .returning(|_| vec![0.1; 384]);
        let mut user_vectors = MockUserVectors::new();
        user_vectors
            .expect_insert()
            .withf(|v| v.model_version == model_version::TEXT_V1 && v.dimension == 384)
            .times(1)
            .returning(|_| Ok(()));
        let mut cache = MockResponseCache::new();
        cache
            .expect_invalidate_pattern()
            .withf(move |pattern| pattern == format!("recommendations:{}:*", user_id))
            .times(1)
            .returning(|_| 2);

        let maintenance = VectorMaintenance::new(
            Arc::new(behavior),
            Arc::new(user_vectors),
            Arc::new(MockConversationVectors::new()),
            Arc::new(embedding),
            Arc::new(cache),
        );

        maintenance.refresh_user_vector(user_id).await;
    }

    #[tokio::test]
    async fn test_unknown_user_skips_embedding_and_store() {
        let mut behavior = MockBehaviorSource::new();
        behavior.expect_user_behavior_text().returning(|_| Ok(None));
        let mut embedding = MockEmbeddingBackend::new();
        embedding.expect_user_vector().times(0);
        let mut user_vectors = MockUserVectors::new();
        user_vectors.expect_insert().times(0);
        let mut cache = MockResponseCache::new();
        cache.expect_invalidate_pattern().times(0);

        let maintenance = VectorMaintenance::new(
            Arc::new(behavior),
            Arc::new(user_vectors),
            Arc::new(MockConversationVectors::new()),
            Arc::new(embedding),
            Arc::new(cache),
        );

        maintenance.refresh_user_vector(Uuid::new_v4()).await;
    }

    #[tokio::test]
    async fn test_store_failure_skips_invalidation_but_does_not_panic() {
        let mut behavior = MockBehaviorSource::new();
        behavior
            .expect_user_behavior_text()
            .returning(|_| Ok(Some(behavior_fixture())));
        let mut embedding = MockEmbeddingBackend::new();
        embedding
            .expect_user_vector()
            .returning(|_| vec![0.1; 384]);
        let mut user_vectors = MockUserVectors::new();
        user_vectors
            .expect_insert()
            .returning(|_| Err(AppError::Database("insert failed".into())));
        let mut cache = MockResponseCache::new();
        cache.expect_invalidate_pattern().times(0);

        let maintenance = VectorMaintenance::new(
            Arc::new(behavior),
            Arc::new(user_vectors),
            Arc::new(MockConversationVectors::new()),
            Arc::new(embedding),
            Arc::new(cache),
        );

        maintenance.refresh_user_vector(Uuid::new_v4()).await;
    }

    #[tokio::test]
    async fn test_conversation_refresh_stores_text_vector() {
        let conversation_id = Uuid::new_v4();
        let subject_id = Uuid::new_v4();

        let mut behavior = MockBehaviorSource::new();
        behavior.expect_conversation_text().returning(|_| {
            Ok(Some(crate::models::ConversationTextData {
                name: "Embedded Systems lab".to_string(),
                subject: Some("Embedded Systems".to_string()),
                tags: vec!["arm".to_string()],
            }))
        });
        behavior
            .expect_conversation_features()
            .returning(move |_| Ok(Some((Some(subject_id), Default::default()))));
        let mut embedding = MockEmbeddingBackend::new();
        embedding
            .expect_conversation_vector()
            .returning(|_| vec![0.2; 384]);
        let mut conversation_vectors = MockConversationVectors::new();
        conversation_vectors
            .expect_insert()
            .withf(move |v| {
                v.model_version == model_version::TEXT_V1 && v.subject_id == Some(subject_id)
            })
            .times(1)
            .returning(|_| Ok(()));

        let maintenance = VectorMaintenance::new(
            Arc::new(behavior),
            Arc::new(MockUserVectors::new()),
            Arc::new(conversation_vectors),
            Arc::new(embedding),
            Arc::new(MockResponseCache::new()),
        );

        maintenance.refresh_conversation_vector(conversation_id).await;
    }
}
