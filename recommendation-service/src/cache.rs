//! Response cache over the shared Redis layer
//!
//! Cache failures only cost freshness, so every Redis error is logged
//! and swallowed here instead of reaching the request path.

use crate::models::RecommendationsResponse;
use crate::services::ResponseCache;
use async_trait::async_trait;
use hub_cache::{ttl, CacheOperations, HubCache};
use tracing::warn;

pub struct RedisResponseCache {
    cache: HubCache,
}

impl RedisResponseCache {
    pub fn new(cache: HubCache) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl ResponseCache for RedisResponseCache {
    async fn get_response(&self, key: &str) -> Option<RecommendationsResponse> {
        match self.cache.get::<RecommendationsResponse>(key).await {
            Ok(cached) => cached,
            Err(e) => {
                warn!(key = %key, error = %e, "Cache read failed, treating as miss");
                None
            }
        }
    }

    async fn set_response(&self, key: &str, response: &RecommendationsResponse) {
        if let Err(e) = self.cache.set(key, response, ttl::RECOMMENDATIONS).await {
            warn!(key = %key, error = %e, "Cache write failed, response not cached");
        }
    }

    async fn invalidate_pattern(&self, pattern: &str) -> usize {
        match self.cache.scan_del(pattern).await {
            Ok(deleted) => deleted,
            Err(e) => {
                warn!(pattern = %pattern, error = %e, "Cache invalidation failed");
                0
            }
        }
    }
}
