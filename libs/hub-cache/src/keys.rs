//! Cache key schema
//!
//! All services must build keys through these generators so that the
//! write side and the invalidation side always agree on the format.
//! Key format: {entity}:{identifier}[:sub_key]

use uuid::Uuid;

/// Cache key builder
pub struct CacheKey;

impl CacheKey {
    // ============= Recommendation Keys =============

    /// Cached recommendation response for one (user, parameters) tuple.
    /// Format: recommendations:{user_id}:{top_k}:{min_similarity}
    pub fn recommendations(user_id: Uuid, top_k: usize, min_similarity: f32) -> String {
        format!("recommendations:{}:{}:{}", user_id, top_k, min_similarity)
    }

    /// Pattern matching every cached recommendation response of a user,
    /// regardless of the requested parameters. Used by vector
    /// maintenance after an upsert.
    pub fn recommendations_pattern(user_id: Uuid) -> String {
        format!("recommendations:{}:*", user_id)
    }

    // ============= Utility =============

    /// Extract the entity prefix from a key, for metrics labeling.
    pub fn entity_type(key: &str) -> Option<&str> {
        key.split(':').next().filter(|s| !s.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recommendations_key() {
        let user_id = Uuid::parse_str("550e8400-e29b-41d4-a716-446655440000").unwrap();
        let key = CacheKey::recommendations(user_id, 10, 0.3);
        assert_eq!(
            key,
            "recommendations:550e8400-e29b-41d4-a716-446655440000:10:0.3"
        );
    }

    #[test]
    fn test_pattern_matches_key_prefix() {
        let user_id = Uuid::new_v4();
        let key = CacheKey::recommendations(user_id, 10, 0.3);
        let pattern = CacheKey::recommendations_pattern(user_id);
        // The glob prefix (everything before '*') must prefix the key,
        // otherwise invalidation would never hit the response cache.
        let prefix = pattern.trim_end_matches('*');
        assert!(key.starts_with(prefix));
    }

    #[test]
    fn test_entity_type() {
        assert_eq!(
            CacheKey::entity_type("recommendations:123:10:0.3"),
            Some("recommendations")
        );
        assert_eq!(CacheKey::entity_type(""), None);
    }
}
