//! Tests for the flow-log format cache: TTL, eviction, concurrency.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use otelship::format_cache::FlowLogFormatCache;

#[test]
fn test_miss_on_unknown_key() {
    let cache = FlowLogFormatCache::new(Duration::from_secs(60));
    assert!(cache.get("nope").is_none());
}

#[test]
fn test_hit_within_ttl() {
    let cache = FlowLogFormatCache::new(Duration::from_millis(100));
    cache.set("g", "${version} ${account-id}", "fl-1", 1);

    thread::sleep(Duration::from_millis(50));
    let (format, flow_log_id, count) = cache.get("g").unwrap();
    assert_eq!(format, "${version} ${account-id}");
    assert_eq!(flow_log_id, "fl-1");
    assert_eq!(count, 1);
}

#[test]
fn test_expired_entry_is_deleted_on_read() {
    let cache = FlowLogFormatCache::new(Duration::from_millis(100));
    cache.set("g", "${version} ${account-id}", "fl-1", 1);
    assert_eq!(cache.len(), 1);

    thread::sleep(Duration::from_millis(200));
    assert!(cache.get("g").is_none());
    assert!(cache.is_empty());
}

#[test]
fn test_set_overwrites_existing_entry() {
    let cache = FlowLogFormatCache::new(Duration::from_secs(60));
    cache.set("g", "old-format", "fl-1", 1);
    cache.set("g", "new-format", "fl-2", 3);

    let (format, flow_log_id, count) = cache.get("g").unwrap();
    assert_eq!(format, "new-format");
    assert_eq!(flow_log_id, "fl-2");
    assert_eq!(count, 3);
    assert_eq!(cache.len(), 1);
}

#[test]
fn test_set_refreshes_expiry() {
    let cache = FlowLogFormatCache::new(Duration::from_millis(150));
    cache.set("g", "format", "fl-1", 1);
    thread::sleep(Duration::from_millis(100));
    cache.set("g", "format", "fl-1", 1);
    thread::sleep(Duration::from_millis(100));
    // The refresh restamped the entry, so it is still alive.
    assert!(cache.get("g").is_some());
}

#[test]
fn test_entries_are_independent() {
    let cache = FlowLogFormatCache::new(Duration::from_secs(60));
    cache.set("a", "format-a", "fl-a", 1);
    cache.set("b", "format-b", "fl-b", 2);

    assert_eq!(cache.get("a").unwrap().0, "format-a");
    assert_eq!(cache.get("b").unwrap().0, "format-b");
    assert_eq!(cache.len(), 2);
}

#[test]
fn test_concurrent_reads_within_ttl() {
    let cache = Arc::new(FlowLogFormatCache::new(Duration::from_secs(60)));
    cache.set("g", "format", "fl-1", 1);

    let handles: Vec<_> = (0..20)
        .map(|_| {
            let cache = cache.clone();
            thread::spawn(move || {
                for _ in 0..100 {
                    assert!(cache.get("g").is_some());
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
}

#[test]
fn test_concurrent_expiry_deletes_exactly_once() {
    let cache = Arc::new(FlowLogFormatCache::new(Duration::from_millis(100)));
    cache.set("g", "${version} ${account-id}", "fl-1", 1);

    thread::sleep(Duration::from_millis(200));

    // Twenty readers race over the expired entry; eviction must not
    // panic and must leave the map empty.
    let handles: Vec<_> = (0..20)
        .map(|_| {
            let cache = cache.clone();
            thread::spawn(move || cache.get("g"))
        })
        .collect();

    for handle in handles {
        assert!(handle.join().unwrap().is_none());
    }
    assert!(cache.is_empty());
}

#[test]
fn test_concurrent_writers_and_readers() {
    let cache = Arc::new(FlowLogFormatCache::new(Duration::from_millis(20)));

    let mut handles = Vec::new();
    for worker in 0..10 {
        let cache = cache.clone();
        handles.push(thread::spawn(move || {
            for i in 0..50 {
                if worker % 2 == 0 {
                    cache.set("g", &format!("format-{i}"), "fl-1", 1);
                } else {
                    let _ = cache.get("g");
                }
            }
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }
}
