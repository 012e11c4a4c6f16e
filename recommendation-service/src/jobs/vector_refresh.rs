//! Periodic vector rebuild
//!
//! Hourly pass that recomputes the hash-encoded vector of every live
//! user and conversation and appends a fresh version to the stores, so
//! request-time misses stay rare and stored vectors track behavior
//! drift. A failure on one entity is logged and the pass moves on.

use crate::config::JobsConfig;
use crate::models::{NewConversationVector, NewProfileVector};
use crate::services::{behavior, encoder, BehaviorSource, ConversationVectors, UserVectors};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{info, warn};

#[derive(Debug, Clone, Default)]
pub struct VectorRefreshStats {
    pub started_at: Option<DateTime<Utc>>,
    pub users_refreshed: u32,
    pub users_skipped: u32,
    pub users_failed: u32,
    pub conversations_refreshed: u32,
    pub conversations_failed: u32,
    pub total_duration_ms: u64,
}

pub struct VectorRefreshJob {
    behavior: Arc<dyn BehaviorSource>,
    user_vectors: Arc<dyn UserVectors>,
    conversation_vectors: Arc<dyn ConversationVectors>,
}

impl VectorRefreshJob {
    pub fn new(
        behavior: Arc<dyn BehaviorSource>,
        user_vectors: Arc<dyn UserVectors>,
        conversation_vectors: Arc<dyn ConversationVectors>,
    ) -> Self {
        Self {
            behavior,
            user_vectors,
            conversation_vectors,
        }
    }

    /// One full rebuild over all live users and conversations.
    pub async fn run_single_pass(&self) -> VectorRefreshStats {
        let start = Instant::now();
        let mut stats = VectorRefreshStats {
            started_at: Some(Utc::now()),
            ..Default::default()
        };

        match self.behavior.active_user_ids().await {
            Ok(user_ids) => {
                info!(users = user_ids.len(), "Rebuilding user vectors");
                for user_id in user_ids {
                    match self.behavior.user_activity(user_id).await {
                        Ok(Some(activity)) => {
                            let data = behavior::aggregate(&activity);
                            let vector = encoder::encode_user_vector(&data);
                            match self
                                .user_vectors
                                .insert(NewProfileVector::hash_encoded(user_id, vector))
                                .await
                            {
                                Ok(()) => stats.users_refreshed += 1,
                                Err(e) => {
                                    stats.users_failed += 1;
                                    warn!(user_id = %user_id, error = %e, "Failed to store rebuilt user vector");
                                }
                            }
                        }
                        Ok(None) => stats.users_skipped += 1,
                        Err(e) => {
                            stats.users_failed += 1;
                            warn!(user_id = %user_id, error = %e, "Failed to load user activity");
                        }
                    }
                }
            }
            Err(e) => warn!(error = %e, "Failed to list users for vector rebuild"),
        }

        match self.behavior.live_conversation_ids().await {
            Ok(conversation_ids) => {
                info!(
                    conversations = conversation_ids.len(),
                    "Rebuilding conversation vectors"
                );
                for conversation_id in conversation_ids {
                    match self.behavior.conversation_features(conversation_id).await {
                        Ok(Some((subject_id, features))) => {
                            let vector = encoder::encode_conversation_vector(
                                &features.faculty_ids,
                                &features.tag_ids,
                            );
                            match self
                                .conversation_vectors
                                .insert(NewConversationVector::hash_encoded(
                                    conversation_id,
                                    subject_id,
                                    vector,
                                ))
                                .await
                            {
                                Ok(()) => stats.conversations_refreshed += 1,
                                Err(e) => {
                                    stats.conversations_failed += 1;
                                    warn!(conversation_id = %conversation_id, error = %e, "Failed to store rebuilt conversation vector");
                                }
                            }
                        }
                        Ok(None) => {}
                        Err(e) => {
                            stats.conversations_failed += 1;
                            warn!(conversation_id = %conversation_id, error = %e, "Failed to load conversation features");
                        }
                    }
                }
            }
            Err(e) => warn!(error = %e, "Failed to list conversations for vector rebuild"),
        }

        stats.total_duration_ms = start.elapsed().as_millis() as u64;
        stats
    }
}

/// Spawn the refresh loop: initial delay, then one pass per interval.
pub fn start_vector_refresh_job(config: JobsConfig, job: VectorRefreshJob) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(
            initial_delay_secs = config.vector_refresh_initial_delay_secs,
            interval_secs = config.vector_refresh_interval_secs,
            "Vector refresh job started"
        );
        sleep(Duration::from_secs(config.vector_refresh_initial_delay_secs)).await;

        loop {
            let stats = job.run_single_pass().await;
            info!(
                users_refreshed = stats.users_refreshed,
                users_skipped = stats.users_skipped,
                users_failed = stats.users_failed,
                conversations_refreshed = stats.conversations_refreshed,
                conversations_failed = stats.conversations_failed,
                duration_ms = stats.total_duration_ms,
                "Vector refresh pass completed"
            );

            sleep(Duration::from_secs(config.vector_refresh_interval_secs)).await;
        }
    })
}
