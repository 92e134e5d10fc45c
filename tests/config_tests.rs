//! Tests for configuration parsing helpers.

use std::time::Duration;

use otelship::config::{
    parse_cache_ttl, parse_vpc_debug_interval, DEFAULT_VPC_DEBUG_INTERVAL, MAX_VPC_DEBUG_INTERVAL,
};

#[test]
fn test_debug_interval_defaults() {
    assert_eq!(parse_vpc_debug_interval(None), DEFAULT_VPC_DEBUG_INTERVAL);
    assert_eq!(parse_vpc_debug_interval(Some(String::new())), DEFAULT_VPC_DEBUG_INTERVAL);
}

#[test]
fn test_debug_interval_rejects_garbage() {
    assert_eq!(
        parse_vpc_debug_interval(Some("not-a-number".to_string())),
        DEFAULT_VPC_DEBUG_INTERVAL
    );
    assert_eq!(parse_vpc_debug_interval(Some("3.5".to_string())), DEFAULT_VPC_DEBUG_INTERVAL);
}

#[test]
fn test_debug_interval_lower_bound() {
    assert_eq!(parse_vpc_debug_interval(Some("0".to_string())), DEFAULT_VPC_DEBUG_INTERVAL);
    assert_eq!(parse_vpc_debug_interval(Some("-5".to_string())), DEFAULT_VPC_DEBUG_INTERVAL);
}

#[test]
fn test_debug_interval_upper_bound_caps() {
    assert_eq!(parse_vpc_debug_interval(Some("20000".to_string())), MAX_VPC_DEBUG_INTERVAL);
    assert_eq!(parse_vpc_debug_interval(Some("10000".to_string())), MAX_VPC_DEBUG_INTERVAL);
}

#[test]
fn test_debug_interval_accepts_valid_values() {
    assert_eq!(parse_vpc_debug_interval(Some("1".to_string())), 1);
    assert_eq!(parse_vpc_debug_interval(Some("50".to_string())), 50);
    assert_eq!(parse_vpc_debug_interval(Some("9999".to_string())), 9999);
}

#[test]
fn test_cache_ttl_default() {
    assert_eq!(parse_cache_ttl(None), Duration::from_secs(600));
    assert_eq!(parse_cache_ttl(Some(String::new())), Duration::from_secs(600));
}

#[test]
fn test_cache_ttl_from_minutes() {
    assert_eq!(parse_cache_ttl(Some("3".to_string())), Duration::from_secs(180));
    assert_eq!(parse_cache_ttl(Some("60".to_string())), Duration::from_secs(3600));
}

#[test]
fn test_cache_ttl_rejects_garbage() {
    assert_eq!(parse_cache_ttl(Some("soon".to_string())), Duration::from_secs(600));
    assert_eq!(parse_cache_ttl(Some("-10".to_string())), Duration::from_secs(600));
}
