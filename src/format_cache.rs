//! In-process cache for flow-log format lookups.
//!
//! Formats rarely change, so results of the DescribeFlowLogs collaborator
//! are memoized per log group with a TTL. Expired entries are evicted
//! lazily by the reader that observes them.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use tracing::debug;

/// Default TTL when none is configured.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(10 * 60);

#[derive(Debug, Clone)]
struct CacheEntry {
    log_format: String,
    flow_log_id: String,
    flow_log_count: usize,
    cached_at: Instant,
}

/// Concurrency-safe log-group → format memoizer.
#[derive(Debug)]
pub struct FlowLogFormatCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    ttl: Duration,
}

impl FlowLogFormatCache {
    pub fn new(ttl: Duration) -> Self {
        let ttl = if ttl.is_zero() { DEFAULT_CACHE_TTL } else { ttl };
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Returns the cached (format, flow-log id, flow-log count) for the
    /// log group, or `None` on miss or expiry. An expired entry is
    /// deleted on the way out: the read lock is released first, and the
    /// entry is re-checked under the write lock because a concurrent
    /// `set` may have refreshed it in between.
    pub fn get(&self, log_group: &str) -> Option<(String, String, usize)> {
        let expired = {
            let entries = self.entries.read().expect("format cache lock poisoned");
            let Some(entry) = entries.get(log_group) else {
                debug!(log_group, "format cache miss");
                return None;
            };

            if entry.cached_at.elapsed() <= self.ttl {
                debug!(
                    log_group,
                    format = %entry.log_format,
                    flow_log_id = %entry.flow_log_id,
                    "format cache hit"
                );
                return Some((
                    entry.log_format.clone(),
                    entry.flow_log_id.clone(),
                    entry.flow_log_count,
                ));
            }
            true
        };

        if expired {
            let mut entries = self.entries.write().expect("format cache lock poisoned");
            if let Some(entry) = entries.get(log_group) {
                if entry.cached_at.elapsed() > self.ttl {
                    entries.remove(log_group);
                    debug!(log_group, "expired format cache entry deleted");
                }
            }
        }

        None
    }

    /// Stores or replaces the entry for the log group, stamping now.
    pub fn set(&self, log_group: &str, log_format: &str, flow_log_id: &str, flow_log_count: usize) {
        let mut entries = self.entries.write().expect("format cache lock poisoned");
        entries.insert(
            log_group.to_string(),
            CacheEntry {
                log_format: log_format.to_string(),
                flow_log_id: flow_log_id.to_string(),
                flow_log_count,
                cached_at: Instant::now(),
            },
        );
        debug!(log_group, format = log_format, flow_log_id, "cached flow log format");
    }

    /// Number of live entries, expired or not.
    pub fn len(&self) -> usize {
        self.entries.read().expect("format cache lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
