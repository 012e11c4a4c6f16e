use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Vector dimension used by the numeric (hash-bucket) encoding path.
pub const VECTOR_DIM: usize = 100;

/// Strategy versions for stored embeddings. Vectors produced by
/// different strategies are never compared against each other, so every
/// read filters on the version the caller expects.
pub mod model_version {
    /// Deterministic hash-bucket encoding over category ids
    pub const HASH_V1: &str = "hash-v1";
    /// Text embeddings from the external AI backend
    pub const TEXT_V1: &str = "text-v1";
}

/// Similarity metric stored vectors are intended for
pub const DEFAULT_METRIC: &str = "cosine";

/// Semantic role of a stored embedding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VectorType {
    UserSubject,
    ConversationTopic,
}

impl VectorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UserSubject => "user_subject",
            Self::ConversationTopic => "conversation_topic",
        }
    }
}

impl std::fmt::Display for VectorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// New profile vector version to append to the store
#[derive(Debug, Clone)]
pub struct NewProfileVector {
    pub user_id: Uuid,
    pub vector_type: VectorType,
    pub dimension: usize,
    pub embedding: Vec<f32>,
    pub metric: &'static str,
    pub model_version: &'static str,
}

impl NewProfileVector {
    pub fn hash_encoded(user_id: Uuid, embedding: Vec<f32>) -> Self {
        Self {
            user_id,
            vector_type: VectorType::UserSubject,
            dimension: embedding.len(),
            embedding,
            metric: DEFAULT_METRIC,
            model_version: model_version::HASH_V1,
        }
    }

    pub fn text_embedded(user_id: Uuid, embedding: Vec<f32>) -> Self {
        Self {
            user_id,
            vector_type: VectorType::UserSubject,
            dimension: embedding.len(),
            embedding,
            metric: DEFAULT_METRIC,
            model_version: model_version::TEXT_V1,
        }
    }
}

/// New conversation vector version to append to the store
#[derive(Debug, Clone)]
pub struct NewConversationVector {
    pub conversation_id: Uuid,
    pub subject_id: Option<Uuid>,
    pub vector_type: VectorType,
    pub dimension: usize,
    pub embedding: Vec<f32>,
    pub metric: &'static str,
    pub model_version: &'static str,
}

impl NewConversationVector {
    pub fn hash_encoded(
        conversation_id: Uuid,
        subject_id: Option<Uuid>,
        embedding: Vec<f32>,
    ) -> Self {
        Self {
            conversation_id,
            subject_id,
            vector_type: VectorType::ConversationTopic,
            dimension: embedding.len(),
            embedding,
            metric: DEFAULT_METRIC,
            model_version: model_version::HASH_V1,
        }
    }

    pub fn text_embedded(
        conversation_id: Uuid,
        subject_id: Option<Uuid>,
        embedding: Vec<f32>,
    ) -> Self {
        Self {
            conversation_id,
            subject_id,
            vector_type: VectorType::ConversationTopic,
            dimension: embedding.len(),
            embedding,
            metric: DEFAULT_METRIC,
            model_version: model_version::TEXT_V1,
        }
    }
}

/// One accumulated category score
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreItem {
    pub id: Uuid,
    pub score: i64,
}

/// Aggregated behavior signals for one user, ready for encoding.
/// Only strictly positive scores survive aggregation.
#[derive(Debug, Clone, Default)]
pub struct UserBehaviorData {
    pub faculty_scores: Vec<ScoreItem>,
    pub type_scores: Vec<ScoreItem>,
    pub tag_scores: Vec<ScoreItem>,
}

impl UserBehaviorData {
    pub fn is_empty(&self) -> bool {
        self.faculty_scores.is_empty() && self.type_scores.is_empty() && self.tag_scores.is_empty()
    }
}

/// One weighted text label (subject or tag name)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextScoreItem {
    pub name: String,
    pub score: i64,
}

/// Text-valued behavior signals for the embedding-based maintenance path
#[derive(Debug, Clone, Default)]
pub struct UserBehaviorTextData {
    pub subject_scores: Vec<TextScoreItem>,
    pub tag_scores: Vec<TextScoreItem>,
}

/// Raw activity rows for one user, fetched by the behavior repository
/// and folded into [`UserBehaviorData`] by the aggregator.
#[derive(Debug, Clone, Default)]
pub struct UserActivity {
    pub documents: Vec<AuthoredDocument>,
    pub memberships: Vec<JoinedConversation>,
    pub reviews: Vec<CastReview>,
}

#[derive(Debug, Clone)]
pub struct AuthoredDocument {
    pub document_id: Uuid,
    pub type_id: Option<Uuid>,
    /// Distinct faculties reached via subject -> majors -> faculty
    pub faculty_ids: Vec<Uuid>,
}

#[derive(Debug, Clone)]
pub struct JoinedConversation {
    pub conversation_id: Uuid,
    pub faculty_ids: Vec<Uuid>,
    pub tag_ids: Vec<Uuid>,
}

#[derive(Debug, Clone)]
pub struct CastReview {
    pub document_id: Uuid,
    pub useful: bool,
    pub type_id: Option<Uuid>,
    pub faculty_ids: Vec<Uuid>,
}

/// Category ids feeding the conversation-side encoder
#[derive(Debug, Clone, Default)]
pub struct ConversationFeatures {
    pub faculty_ids: Vec<Uuid>,
    pub tag_ids: Vec<Uuid>,
}

/// Display text for the embedding-based conversation refresh
#[derive(Debug, Clone)]
pub struct ConversationTextData {
    pub name: String,
    pub subject: Option<String>,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectSummary {
    pub id: Uuid,
    pub name: String,
    pub code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagSummary {
    pub id: Uuid,
    pub name: String,
}

/// A conversation eligible for recommendation, with the metadata the
/// response needs and the category ids the encoder needs on a vector
/// miss.
#[derive(Debug, Clone)]
pub struct ConversationCandidate {
    pub id: Uuid,
    pub name: String,
    pub subject_id: Option<Uuid>,
    pub subject: Option<SubjectSummary>,
    pub tags: Vec<TagSummary>,
    pub avatar_url: Option<String>,
    pub member_count: i64,
    pub has_pending_join_request: bool,
    pub faculty_ids: Vec<Uuid>,
}

/// One ranked entry as returned by the similarity backend
#[derive(Debug, Clone, PartialEq)]
pub struct RankedConversation {
    pub conversation_id: Uuid,
    pub similarity: f32,
    pub rank: i32,
}

/// Ranked batch plus processing metadata from the backend
#[derive(Debug, Clone, Default)]
pub struct RankedBatch {
    pub items: Vec<RankedConversation>,
    pub total_processed: i64,
    pub processing_time_ms: f64,
}

/// Candidate id + vector pair shipped to the similarity backend
#[derive(Debug, Clone)]
pub struct CandidateVector {
    pub id: Uuid,
    pub vector: Vec<f32>,
}

// ============= Response DTOs =============

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationRecommendation {
    pub conversation_id: Uuid,
    pub conversation_name: String,
    pub similarity: f32,
    pub rank: i32,
    pub subject: Option<SubjectSummary>,
    pub tags: Vec<TagSummary>,
    pub avatar_url: Option<String>,
    pub member_count: i64,
    pub is_current_user_member: bool,
    pub has_pending_join_request: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationsResponse {
    pub recommendations: Vec<ConversationRecommendation>,
    pub total_processed: i64,
    pub processing_time_ms: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_serializes_camel_case() {
        let response = RecommendationsResponse {
            recommendations: vec![ConversationRecommendation {
                conversation_id: Uuid::new_v4(),
                conversation_name: "Circuit Analysis Q&A".to_string(),
                similarity: 0.82,
                rank: 1,
                subject: Some(SubjectSummary {
                    id: Uuid::new_v4(),
                    name: "Circuit Analysis".to_string(),
                    code: "EE101".to_string(),
                }),
                tags: vec![TagSummary {
                    id: Uuid::new_v4(),
                    name: "electronics".to_string(),
                }],
                avatar_url: None,
                member_count: 12,
                is_current_user_member: false,
                has_pending_join_request: false,
            }],
            total_processed: 5,
            processing_time_ms: 12.5,
        };

        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("totalProcessed").is_some());
        assert!(json.get("processingTimeMs").is_some());
        let rec = &json["recommendations"][0];
        assert!(rec.get("conversationId").is_some());
        assert!(rec.get("memberCount").is_some());
        assert!(rec.get("isCurrentUserMember").is_some());
        assert!(rec.get("hasPendingJoinRequest").is_some());
    }

    #[test]
    fn test_vector_type_tags() {
        assert_eq!(VectorType::UserSubject.as_str(), "user_subject");
        assert_eq!(VectorType::ConversationTopic.as_str(), "conversation_topic");
    }
}
