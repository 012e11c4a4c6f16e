//! Hash-bucket vector encoder
//!
//! Turns weighted category scores into a fixed-dimension numeric
//! vector. The 100 components are partitioned into three fixed bands:
//!
//! - 0..=29  faculty
//! - 30..=49 document type
//! - 50..=99 tag
//!
//! Each category id is assigned a bucket inside its band by a stable
//! hash; two ids landing in the same bucket simply accumulate. This is
//! accepted lossy compression, not an error. The whole vector is
//! L2-normalized at the end.
//!
//! The bucket hash is SHA-256 over the UUID's 16 raw bytes truncated
//! to a little-endian u64, so bucket assignment is identical across
//! processes and platforms. Changing it invalidates every stored
//! `hash-v1` vector, which is why the hash is pinned here rather than
//! delegated to `std::hash`.

use crate::models::{ScoreItem, UserBehaviorData, VECTOR_DIM};
use sha2::{Digest, Sha256};
use uuid::Uuid;

const FACULTY_BAND_START: usize = 0;
const FACULTY_BAND_WIDTH: usize = 30;
const TYPE_BAND_START: usize = 30;
const TYPE_BAND_WIDTH: usize = 20;
const TAG_BAND_START: usize = 50;
const TAG_BAND_WIDTH: usize = 50;

// Behavior-derived user vector weights
const USER_FACULTY_WEIGHT: f32 = 0.4;
const USER_TYPE_WEIGHT: f32 = 0.3;
const USER_TAG_WEIGHT: f32 = 0.3;

// Metadata-derived conversation vector weights (type band unused)
const CONV_FACULTY_WEIGHT: f32 = 0.5;
const CONV_TAG_WEIGHT: f32 = 0.5;

/// Stable bucket hash over a category id
fn bucket_hash(id: &Uuid) -> u64 {
    let digest = Sha256::digest(id.as_bytes());
    let mut first8 = [0u8; 8];
    first8.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(first8)
}

fn bucket_index(id: &Uuid, band_start: usize, band_width: usize) -> usize {
    band_start + (bucket_hash(id) % band_width as u64) as usize
}

/// Spread one band's scores over its buckets, normalized by the band's
/// total score and scaled by the band weight.
fn encode_band(
    vector: &mut [f32],
    scores: &[ScoreItem],
    band_start: usize,
    band_width: usize,
    band_weight: f32,
) {
    let total: i64 = scores.iter().map(|s| s.score).sum();
    if total <= 0 {
        return;
    }

    for item in scores {
        let idx = bucket_index(&item.id, band_start, band_width);
        vector[idx] += band_weight * (item.score as f32 / total as f32);
    }
}

/// Spread ids over a band with an equal share of the band weight each
fn encode_band_equal(vector: &mut [f32], ids: &[Uuid], band_start: usize, band_width: usize, band_weight: f32) {
    if ids.is_empty() {
        return;
    }

    let share = band_weight / ids.len() as f32;
    for id in ids {
        let idx = bucket_index(id, band_start, band_width);
        vector[idx] += share;
    }
}

fn l2_normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in vector.iter_mut() {
            *v /= norm;
        }
    }
}

/// Encode a user's aggregated behavior scores into a unit vector
pub fn encode_user_vector(behavior: &UserBehaviorData) -> Vec<f32> {
    let mut vector = vec![0.0f32; VECTOR_DIM];

    encode_band(
        &mut vector,
        &behavior.faculty_scores,
        FACULTY_BAND_START,
        FACULTY_BAND_WIDTH,
        USER_FACULTY_WEIGHT,
    );
    encode_band(
        &mut vector,
        &behavior.type_scores,
        TYPE_BAND_START,
        TYPE_BAND_WIDTH,
        USER_TYPE_WEIGHT,
    );
    encode_band(
        &mut vector,
        &behavior.tag_scores,
        TAG_BAND_START,
        TAG_BAND_WIDTH,
        USER_TAG_WEIGHT,
    );

    l2_normalize(&mut vector);
    vector
}

/// Encode a conversation's faculty and tag ids into a unit vector
pub fn encode_conversation_vector(faculty_ids: &[Uuid], tag_ids: &[Uuid]) -> Vec<f32> {
    let mut vector = vec![0.0f32; VECTOR_DIM];

    encode_band_equal(
        &mut vector,
        faculty_ids,
        FACULTY_BAND_START,
        FACULTY_BAND_WIDTH,
        CONV_FACULTY_WEIGHT,
    );
    encode_band_equal(
        &mut vector,
        tag_ids,
        TAG_BAND_START,
        TAG_BAND_WIDTH,
        CONV_TAG_WEIGHT,
    );

    l2_normalize(&mut vector);
    vector
}
