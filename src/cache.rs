//! In-memory caching for frequently accessed data.
//! Uses moka for TTL-based caching with LRU eviction.

use moka::sync::Cache;
use once_cell::sync::Lazy;
use serde_json::Value;
use std::time::Duration;

/// Politician detail payloads (profile plus aggregates) with a 60 second TTL.
/// Key is politician id.
static POLITICIAN_DETAIL_CACHE: Lazy<Cache<i32, Value>> = Lazy::new(|| {
    Cache::builder()
        .time_to_live(Duration::from_secs(60))
        .max_capacity(5_000)
        .build()
});

pub fn get_politician_detail(politician_id: i32) -> Option<Value> {
    POLITICIAN_DETAIL_CACHE.get(&politician_id)
}

pub fn store_politician_detail(politician_id: i32, detail: Value) {
    POLITICIAN_DETAIL_CACHE.insert(politician_id, detail);
}

/// Call after a statement is added for this politician.
pub fn invalidate_politician_detail(politician_id: i32) {
    POLITICIAN_DETAIL_CACHE.invalidate(&politician_id);
}

/// Call after a scoring pass or ingestion run rewrites politician rows.
pub fn invalidate_all_politician_details() {
    POLITICIAN_DETAIL_CACHE.invalidate_all();
}
