//! Behavior and feature reads
//!
//! Faculty affinity is derived through the curriculum: a document or
//! conversation belongs to a subject, subjects are taught in majors,
//! and each major belongs to a faculty. Deleted rows never contribute.

use crate::error::Result;
use crate::models::{
    AuthoredDocument, CastReview, ConversationFeatures, ConversationTextData, JoinedConversation,
    TextScoreItem, UserActivity, UserBehaviorTextData,
};
use crate::services::behavior::{
    CONVERSATION_JOINED_SCORE, DOCUMENT_CREATED_SCORE, USEFUL_VOTE_SCORE,
};
use crate::services::BehaviorSource;
use async_trait::async_trait;
use sqlx::{PgPool, Row};
use std::collections::HashMap;
use uuid::Uuid;

/// Weight of the user's own major in the text-valued profile
const MAJOR_SCORE: i64 = 5;

pub struct PgBehaviorRepo {
    pool: PgPool,
}

impl PgBehaviorRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn user_exists(&self, user_id: Uuid) -> Result<bool> {
        let row = sqlx::query("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1 AND NOT is_deleted)")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(row.get::<bool, _>(0))
    }

    async fn authored_documents(&self, user_id: Uuid) -> Result<Vec<AuthoredDocument>> {
        // One row per (document, faculty); faculty is NULL when the
        // document's subject maps to no major.
        let rows = sqlx::query(
            r#"
            SELECT d.id AS document_id, d.document_type_id, m.faculty_id
            FROM documents d
            LEFT JOIN subject_majors sm ON sm.subject_id = d.subject_id
            LEFT JOIN majors m ON m.id = sm.major_id AND NOT m.is_deleted
            WHERE d.created_by_id = $1
              AND NOT d.is_deleted
              AND EXISTS (SELECT 1 FROM document_files df WHERE df.document_id = d.id)
            ORDER BY d.created_at, d.id
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let mut order: Vec<Uuid> = Vec::new();
        let mut documents: HashMap<Uuid, AuthoredDocument> = HashMap::new();
        for row in rows {
            let document_id: Uuid = row.get("document_id");
            let doc = documents.entry(document_id).or_insert_with(|| {
                order.push(document_id);
                AuthoredDocument {
                    document_id,
                    type_id: row.get("document_type_id"),
                    faculty_ids: Vec::new(),
                }
            });
            if let Some(faculty_id) = row.get::<Option<Uuid>, _>("faculty_id") {
                doc.faculty_ids.push(faculty_id);
            }
        }

        Ok(order
            .into_iter()
            .filter_map(|id| documents.remove(&id))
            .collect())
    }

    async fn joined_conversations(&self, user_id: Uuid) -> Result<Vec<JoinedConversation>> {
        let faculty_rows = sqlx::query(
            r#"
            SELECT cm.conversation_id, m.faculty_id
            FROM conversation_members cm
            JOIN conversations c ON c.id = cm.conversation_id AND NOT c.is_deleted
            LEFT JOIN subject_majors sm ON sm.subject_id = c.subject_id
            LEFT JOIN majors m ON m.id = sm.major_id AND NOT m.is_deleted
            WHERE cm.user_id = $1 AND NOT cm.is_deleted
            ORDER BY cm.created_at, cm.conversation_id
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let tag_rows = sqlx::query(
            r#"
            SELECT cm.conversation_id, ct.tag_id
            FROM conversation_members cm
            JOIN conversations c ON c.id = cm.conversation_id AND NOT c.is_deleted
            JOIN conversation_tags ct ON ct.conversation_id = c.id
            WHERE cm.user_id = $1 AND NOT cm.is_deleted
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let mut tags_by_conversation: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
        for row in tag_rows {
            tags_by_conversation
                .entry(row.get("conversation_id"))
                .or_default()
                .push(row.get("tag_id"));
        }

        let mut order: Vec<Uuid> = Vec::new();
        let mut memberships: HashMap<Uuid, JoinedConversation> = HashMap::new();
        for row in faculty_rows {
            let conversation_id: Uuid = row.get("conversation_id");
            let membership = memberships.entry(conversation_id).or_insert_with(|| {
                order.push(conversation_id);
                JoinedConversation {
                    conversation_id,
                    faculty_ids: Vec::new(),
                    tag_ids: tags_by_conversation
                        .remove(&conversation_id)
                        .unwrap_or_default(),
                }
            });
            if let Some(faculty_id) = row.get::<Option<Uuid>, _>("faculty_id") {
                membership.faculty_ids.push(faculty_id);
            }
        }

        Ok(order
            .into_iter()
            .filter_map(|id| memberships.remove(&id))
            .collect())
    }

    async fn cast_reviews(&self, user_id: Uuid) -> Result<Vec<CastReview>> {
        let rows = sqlx::query(
            r#"
            SELECT dr.id AS review_id, dr.review_type, dr.document_id,
                   d.document_type_id, m.faculty_id
            FROM document_reviews dr
            JOIN documents d ON d.id = dr.document_id AND NOT d.is_deleted
            LEFT JOIN subject_majors sm ON sm.subject_id = d.subject_id
            LEFT JOIN majors m ON m.id = sm.major_id AND NOT m.is_deleted
            WHERE dr.created_by_id = $1 AND NOT dr.is_deleted
            ORDER BY dr.created_at, dr.id
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let mut order: Vec<Uuid> = Vec::new();
        let mut reviews: HashMap<Uuid, CastReview> = HashMap::new();
        for row in rows {
            let review_id: Uuid = row.get("review_id");
            let review = reviews.entry(review_id).or_insert_with(|| {
                order.push(review_id);
                CastReview {
                    document_id: row.get("document_id"),
                    useful: row.get::<String, _>("review_type") == "useful",
                    type_id: row.get("document_type_id"),
                    faculty_ids: Vec::new(),
                }
            });
            if let Some(faculty_id) = row.get::<Option<Uuid>, _>("faculty_id") {
                review.faculty_ids.push(faculty_id);
            }
        }

        Ok(order
            .into_iter()
            .filter_map(|id| reviews.remove(&id))
            .collect())
    }
}

/// Insertion-ordered accumulator for name-keyed scores
#[derive(Default)]
struct TextScoreMap {
    order: Vec<String>,
    scores: HashMap<String, i64>,
}

impl TextScoreMap {
    fn add(&mut self, name: &str, score: i64) {
        match self.scores.get_mut(name) {
            Some(existing) => *existing += score,
            None => {
                self.scores.insert(name.to_string(), score);
                self.order.push(name.to_string());
            }
        }
    }

    fn into_positive(self) -> Vec<TextScoreItem> {
        self.order
            .into_iter()
            .filter_map(|name| {
                let score = self.scores[&name];
                (score > 0).then_some(TextScoreItem { name, score })
            })
            .collect()
    }
}

#[async_trait]
impl BehaviorSource for PgBehaviorRepo {
    async fn user_activity(&self, user_id: Uuid) -> Result<Option<UserActivity>> {
        if !self.user_exists(user_id).await? {
            return Ok(None);
        }

        Ok(Some(UserActivity {
            documents: self.authored_documents(user_id).await?,
            memberships: self.joined_conversations(user_id).await?,
            reviews: self.cast_reviews(user_id).await?,
        }))
    }

    async fn user_behavior_text(&self, user_id: Uuid) -> Result<Option<UserBehaviorTextData>> {
        let user_row = sqlx::query(
            r#"
            SELECT m.major_name
            FROM users u
            LEFT JOIN majors m ON m.id = u.major_id AND NOT m.is_deleted
            WHERE u.id = $1 AND NOT u.is_deleted
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(user_row) = user_row else {
            return Ok(None);
        };

        let mut subjects = TextScoreMap::default();
        let mut tags = TextScoreMap::default();

        if let Some(major_name) = user_row.get::<Option<String>, _>("major_name") {
            subjects.add(&major_name, MAJOR_SCORE);
        }

        let document_rows = sqlx::query(
            r#"
            SELECT d.id AS document_id, s.subject_name, t.tag_name
            FROM documents d
            LEFT JOIN subjects s ON s.id = d.subject_id AND NOT s.is_deleted
            LEFT JOIN document_tags dt ON dt.document_id = d.id
            LEFT JOIN tags t ON t.id = dt.tag_id
            WHERE d.created_by_id = $1
              AND NOT d.is_deleted
              AND EXISTS (SELECT 1 FROM document_files df WHERE df.document_id = d.id)
            ORDER BY d.created_at, d.id
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        // Subject is credited once per document, not once per tag row
        let mut seen_document: Option<Uuid> = None;
        for row in &document_rows {
            let document_id: Uuid = row.get("document_id");
            if seen_document != Some(document_id) {
                if let Some(subject_name) = row.get::<Option<String>, _>("subject_name") {
                    subjects.add(&subject_name, DOCUMENT_CREATED_SCORE);
                }
            }
            seen_document = Some(document_id);
            if let Some(tag_name) = row.get::<Option<String>, _>("tag_name") {
                tags.add(&tag_name, DOCUMENT_CREATED_SCORE);
            }
        }

        let membership_rows = sqlx::query(
            r#"
            SELECT c.id AS conversation_id, s.subject_name, t.tag_name
            FROM conversation_members cm
            JOIN conversations c ON c.id = cm.conversation_id AND NOT c.is_deleted
            LEFT JOIN subjects s ON s.id = c.subject_id AND NOT s.is_deleted
            LEFT JOIN conversation_tags ct ON ct.conversation_id = c.id
            LEFT JOIN tags t ON t.id = ct.tag_id
            WHERE cm.user_id = $1 AND NOT cm.is_deleted
            ORDER BY cm.created_at, c.id
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let mut seen_conversation: Option<Uuid> = None;
        for row in &membership_rows {
            let conversation_id: Uuid = row.get("conversation_id");
            if seen_conversation != Some(conversation_id) {
                if let Some(subject_name) = row.get::<Option<String>, _>("subject_name") {
                    subjects.add(&subject_name, CONVERSATION_JOINED_SCORE);
                }
            }
            seen_conversation = Some(conversation_id);
            if let Some(tag_name) = row.get::<Option<String>, _>("tag_name") {
                tags.add(&tag_name, CONVERSATION_JOINED_SCORE);
            }
        }

        // Only "useful" votes signal interest in the text profile;
        // "not useful" judges document quality, not topic affinity.
        let review_rows = sqlx::query(
            r#"
            SELECT dr.id AS review_id, s.subject_name, t.tag_name
            FROM document_reviews dr
            JOIN documents d ON d.id = dr.document_id AND NOT d.is_deleted
            LEFT JOIN subjects s ON s.id = d.subject_id AND NOT s.is_deleted
            LEFT JOIN document_tags dt ON dt.document_id = d.id
            LEFT JOIN tags t ON t.id = dt.tag_id
            WHERE dr.created_by_id = $1
              AND NOT dr.is_deleted
              AND dr.review_type = 'useful'
            ORDER BY dr.created_at, dr.id
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let mut seen_review: Option<Uuid> = None;
        for row in &review_rows {
            let review_id: Uuid = row.get("review_id");
            if seen_review != Some(review_id) {
                if let Some(subject_name) = row.get::<Option<String>, _>("subject_name") {
                    subjects.add(&subject_name, USEFUL_VOTE_SCORE);
                }
            }
            seen_review = Some(review_id);
            if let Some(tag_name) = row.get::<Option<String>, _>("tag_name") {
                tags.add(&tag_name, USEFUL_VOTE_SCORE);
            }
        }

        Ok(Some(UserBehaviorTextData {
            subject_scores: subjects.into_positive(),
            tag_scores: tags.into_positive(),
        }))
    }

    async fn conversation_features(
        &self,
        conversation_id: Uuid,
    ) -> Result<Option<(Option<Uuid>, ConversationFeatures)>> {
        let conversation = sqlx::query(
            "SELECT subject_id FROM conversations WHERE id = $1 AND NOT is_deleted",
        )
        .bind(conversation_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(conversation) = conversation else {
            return Ok(None);
        };
        let subject_id: Option<Uuid> = conversation.get("subject_id");

        let faculty_ids = match subject_id {
            Some(subject_id) => sqlx::query(
                r#"
                SELECT DISTINCT m.faculty_id
                FROM subject_majors sm
                JOIN majors m ON m.id = sm.major_id AND NOT m.is_deleted
                WHERE sm.subject_id = $1
                "#,
            )
            .bind(subject_id)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(|row| row.get("faculty_id"))
            .collect(),
            None => Vec::new(),
        };

        let tag_ids = sqlx::query("SELECT tag_id FROM conversation_tags WHERE conversation_id = $1")
            .bind(conversation_id)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(|row| row.get("tag_id"))
            .collect();

        Ok(Some((
            subject_id,
            ConversationFeatures {
                faculty_ids,
                tag_ids,
            },
        )))
    }

    async fn conversation_text(
        &self,
        conversation_id: Uuid,
    ) -> Result<Option<ConversationTextData>> {
        let conversation = sqlx::query(
            r#"
            SELECT c.conversation_name, s.subject_name
            FROM conversations c
            LEFT JOIN subjects s ON s.id = c.subject_id AND NOT s.is_deleted
            WHERE c.id = $1 AND NOT c.is_deleted
            "#,
        )
        .bind(conversation_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(conversation) = conversation else {
            return Ok(None);
        };

        let tags = sqlx::query(
            r#"
            SELECT t.tag_name
            FROM conversation_tags ct
            JOIN tags t ON t.id = ct.tag_id
            WHERE ct.conversation_id = $1
            "#,
        )
        .bind(conversation_id)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(|row| row.get("tag_name"))
        .collect();

        Ok(Some(ConversationTextData {
            name: conversation.get("conversation_name"),
            subject: conversation.get("subject_name"),
            tags,
        }))
    }

    async fn active_user_ids(&self) -> Result<Vec<Uuid>> {
        let rows = sqlx::query("SELECT id FROM users WHERE NOT is_deleted ORDER BY created_at")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(|row| row.get("id")).collect())
    }

    async fn live_conversation_ids(&self) -> Result<Vec<Uuid>> {
        let rows = sqlx::query(
            r#"
            SELECT id FROM conversations
            WHERE NOT is_deleted AND conversation_status = 'active'
            ORDER BY created_at
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|row| row.get("id")).collect())
    }
}
