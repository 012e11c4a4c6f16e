//! Candidate conversation listing
//!
//! One query selects the candidate rows, then member counts, tags,
//! pending join requests, and faculty ids are fetched in batches keyed
//! by `= ANY($1)` instead of per-candidate round trips.

use crate::error::Result;
use crate::models::{ConversationCandidate, SubjectSummary, TagSummary};
use crate::services::ConversationCatalog;
use async_trait::async_trait;
use sqlx::{PgPool, Row};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

pub struct PgConversationRepo {
    pool: PgPool,
}

impl PgConversationRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ConversationCatalog for PgConversationRepo {
    async fn active_candidates(&self, user_id: Uuid) -> Result<Vec<ConversationCandidate>> {
        let rows = sqlx::query(
            r#"
            SELECT c.id, c.conversation_name, c.avatar_url, c.subject_id,
                   s.id AS s_id, s.subject_name, s.subject_code
            FROM conversations c
            LEFT JOIN subjects s ON s.id = c.subject_id AND NOT s.is_deleted
            WHERE NOT c.is_deleted
              AND c.conversation_status = 'active'
              AND NOT EXISTS (
                  SELECT 1 FROM conversation_members cm
                  WHERE cm.conversation_id = c.id
                    AND cm.user_id = $1
                    AND NOT cm.is_deleted
              )
            ORDER BY c.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let conversation_ids: Vec<Uuid> = rows.iter().map(|row| row.get("id")).collect();
        let subject_ids: Vec<Uuid> = rows
            .iter()
            .filter_map(|row| row.get::<Option<Uuid>, _>("subject_id"))
            .collect();

        let member_counts: HashMap<Uuid, i64> = sqlx::query(
            r#"
            SELECT conversation_id, COUNT(*) AS member_count
            FROM conversation_members
            WHERE conversation_id = ANY($1) AND NOT is_deleted
            GROUP BY conversation_id
            "#,
        )
        .bind(&conversation_ids)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(|row| (row.get("conversation_id"), row.get("member_count")))
        .collect();

        let mut tags_by_conversation: HashMap<Uuid, Vec<TagSummary>> = HashMap::new();
        let tag_rows = sqlx::query(
            r#"
            SELECT ct.conversation_id, t.id, t.tag_name
            FROM conversation_tags ct
            JOIN tags t ON t.id = ct.tag_id
            WHERE ct.conversation_id = ANY($1)
            ORDER BY t.tag_name
            "#,
        )
        .bind(&conversation_ids)
        .fetch_all(&self.pool)
        .await?;
        for row in tag_rows {
            tags_by_conversation
                .entry(row.get("conversation_id"))
                .or_default()
                .push(TagSummary {
                    id: row.get("id"),
                    name: row.get("tag_name"),
                });
        }

        let pending_requests: HashSet<Uuid> = sqlx::query(
            r#"
            SELECT DISTINCT conversation_id
            FROM conversation_join_requests
            WHERE conversation_id = ANY($1)
              AND created_by_id = $2
              AND status = 'pending_review'
              AND NOT is_deleted
            "#,
        )
        .bind(&conversation_ids)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(|row| row.get("conversation_id"))
        .collect();

        let mut faculties_by_subject: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
        if !subject_ids.is_empty() {
            let faculty_rows = sqlx::query(
                r#"
                SELECT DISTINCT sm.subject_id, m.faculty_id
                FROM subject_majors sm
                JOIN majors m ON m.id = sm.major_id AND NOT m.is_deleted
                WHERE sm.subject_id = ANY($1)
                "#,
            )
            .bind(&subject_ids)
            .fetch_all(&self.pool)
            .await?;
            for row in faculty_rows {
                faculties_by_subject
                    .entry(row.get("subject_id"))
                    .or_default()
                    .push(row.get("faculty_id"));
            }
        }

        let candidates = rows
            .into_iter()
            .map(|row| {
                let id: Uuid = row.get("id");
                let subject_id: Option<Uuid> = row.get("subject_id");
                let subject = row
                    .get::<Option<Uuid>, _>("s_id")
                    .map(|s_id| SubjectSummary {
                        id: s_id,
                        name: row.get("subject_name"),
                        code: row.get("subject_code"),
                    });

                ConversationCandidate {
                    id,
                    name: row.get("conversation_name"),
                    subject_id,
                    subject,
                    tags: tags_by_conversation.remove(&id).unwrap_or_default(),
                    avatar_url: row.get("avatar_url"),
                    member_count: member_counts.get(&id).copied().unwrap_or(0),
                    has_pending_join_request: pending_requests.contains(&id),
                    faculty_ids: subject_id
                        .and_then(|s| faculties_by_subject.get(&s).cloned())
                        .unwrap_or_default(),
                }
            })
            .collect();

        Ok(candidates)
    }
}
