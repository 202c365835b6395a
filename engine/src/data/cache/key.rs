//! Cache key builder

use crate::core::constants::CACHE_KEY_FILTER_PREFIX;

/// Cache key builder
///
/// The cache store is external; this only fixes the key layout.
pub struct CacheKey;

impl CacheKey {
    /// Cache key for one page of a filtered dataset query
    pub fn filter(dataset_id: &str, canonical_hash: &str, page: u32) -> String {
        format!(
            "{}:{}:{}:{}",
            CACHE_KEY_FILTER_PREFIX, dataset_id, canonical_hash, page
        )
    }

    /// Prefix matching every cached page of a dataset, for invalidation
    pub fn filter_dataset_prefix(dataset_id: &str) -> String {
        format!("{}:{}:", CACHE_KEY_FILTER_PREFIX, dataset_id)
    }
}
