//! Deterministic rollout bucketing.

use std::io::Cursor;

use murmur3::murmur3_32;

/// Computes the rollout bucket in `[0, 100)` for an entity/feature pair.
///
/// MurmurHash3 (x86, 32-bit, seed 0) over `"{entity_id}:{feature_id}"`. No
/// per-process state, so the bucket is stable across restarts.
pub fn rollout_bucket(entity_id: &str, feature_id: &str) -> u32 {
    let input = format!("{}:{}", entity_id, feature_id);
    let hash = murmur3_32(&mut Cursor::new(input.as_bytes()), 0).unwrap_or(0);
    hash % 100
}

/// Returns true if the entity falls inside the rollout percentage.
pub fn in_rollout(entity_id: &str, feature_id: &str, percentage: u32) -> bool {
    if percentage >= 100 {
        return true;
    }
    rollout_bucket(entity_id, feature_id) < percentage
}
