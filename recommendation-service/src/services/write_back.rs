//! Background vector write-back
//!
//! Vectors computed during a cache miss are persisted off the request
//! path. Instead of detaching anonymous tasks, pending writes go
//! through a bounded queue consumed by one worker, so shutdown can
//! drain deterministically and tests can observe queued work. A full
//! queue drops the write with a warning: the vector is recomputed on
//! the next miss, losing it costs only freshness.

use crate::models::{NewConversationVector, NewProfileVector};
use crate::services::{ConversationVectors, UserVectors};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

#[derive(Debug)]
pub enum PendingVectorWrite {
    User(NewProfileVector),
    Conversation(NewConversationVector),
}

/// Handle for enqueueing vector writes
#[derive(Clone)]
pub struct VectorWriteQueue {
    tx: mpsc::Sender<PendingVectorWrite>,
}

impl VectorWriteQueue {
    /// Non-blocking enqueue; drops the write when the queue is full.
    pub fn enqueue(&self, write: PendingVectorWrite) {
        if let Err(e) = self.tx.try_send(write) {
            warn!(error = %e, "Vector write-back queue full, dropping write");
        }
    }
}

/// Spawn the write-back worker. Returns the enqueue handle and the
/// worker task; dropping every handle closes the queue and the worker
/// drains what is left before exiting.
pub fn start_write_back_worker(
    capacity: usize,
    user_vectors: Arc<dyn UserVectors>,
    conversation_vectors: Arc<dyn ConversationVectors>,
) -> (VectorWriteQueue, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::channel::<PendingVectorWrite>(capacity);

    let worker = tokio::spawn(async move {
        while let Some(write) = rx.recv().await {
            match write {
                PendingVectorWrite::User(vector) => {
                    let user_id = vector.user_id;
                    if let Err(e) = user_vectors.insert(vector).await {
                        warn!(user_id = %user_id, error = %e, "Failed to persist user vector");
                    } else {
                        debug!(user_id = %user_id, "Persisted user vector");
                    }
                }
                PendingVectorWrite::Conversation(vector) => {
                    let conversation_id = vector.conversation_id;
                    if let Err(e) = conversation_vectors.insert(vector).await {
                        warn!(
                            conversation_id = %conversation_id,
                            error = %e,
                            "Failed to persist conversation vector"
                        );
                    } else {
                        debug!(conversation_id = %conversation_id, "Persisted conversation vector");
                    }
                }
            }
        }
        info!("Vector write-back worker drained and stopped");
    });

    (VectorWriteQueue { tx }, worker)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{MockConversationVectors, MockUserVectors};
    use uuid::Uuid;

    #[tokio::test]
    async fn test_queued_user_write_reaches_store() {
        let mut user_vectors = MockUserVectors::new();
        user_vectors
            .expect_insert()
            .times(1)
            .returning(|_| Ok(()));
        let conversation_vectors = MockConversationVectors::new();

        let (queue, worker) = start_write_back_worker(
            8,
            Arc::new(user_vectors),
            Arc::new(conversation_vectors),
        );

        queue.enqueue(PendingVectorWrite::User(NewProfileVector::hash_encoded(
            Uuid::new_v4(),
            vec![0.0; 100],
        )));

        drop(queue);
        worker.await.unwrap();
    }

    #[tokio::test]
    async fn test_store_failure_does_not_stop_worker() {
        let mut user_vectors = MockUserVectors::new();
        user_vectors.expect_insert().times(2).returning(|_| {
            Err(crate::error::AppError::Database("connection lost".into()))
        });
        let conversation_vectors = MockConversationVectors::new();

        let (queue, worker) = start_write_back_worker(
            8,
            Arc::new(user_vectors),
            Arc::new(conversation_vectors),
        );

        for _ in 0..2 {
            queue.enqueue(PendingVectorWrite::User(NewProfileVector::hash_encoded(
                Uuid::new_v4(),
                vec![0.0; 100],
            )));
        }

        drop(queue);
        // Worker survives both failures and exits cleanly on close
        worker.await.unwrap();
    }

    #[tokio::test]
    async fn test_full_queue_drops_write() {
        let mut user_vectors = MockUserVectors::new();
        // At most one write can be buffered; the second is dropped
        user_vectors
            .expect_insert()
            .times(0..=1)
            .returning(|_| Ok(()));
        let conversation_vectors = MockConversationVectors::new();

        let (tx, rx) = mpsc::channel::<PendingVectorWrite>(1);
        let queue = VectorWriteQueue { tx };
        // Worker not started yet, so the buffer fills immediately
        queue.enqueue(PendingVectorWrite::User(NewProfileVector::hash_encoded(
            Uuid::new_v4(),
            vec![0.0; 100],
        )));
        queue.enqueue(PendingVectorWrite::User(NewProfileVector::hash_encoded(
            Uuid::new_v4(),
            vec![0.0; 100],
        )));

        drop(queue);
        let mut rx = rx;
        let mut received = 0;
        while rx.recv().await.is_some() {
            received += 1;
        }
        assert_eq!(received, 1);
        let _ = (user_vectors, conversation_vectors);
    }
}
