use std::env;
use std::time::Duration;

use anyhow::Result;
use tracing::error;

// Environment variable names.
pub const OTLP_ENDPOINT_VAR: &str = "OTLP_ENDPOINT";
pub const OTLP_ENDPOINT_ALIAS_VAR: &str = "SWI_OTEL_ENDPOINT";
pub const API_TOKEN_VAR: &str = "API_TOKEN";
pub const API_TOKEN_ALIAS_VAR: &str = "SWI_API_KEY";
pub const USE_ENCRYPTION_VAR: &str = "USE_ENCRYPTION";
pub const LAMBDA_INIT_TYPE_VAR: &str = "AWS_LAMBDA_INITIALIZATION_TYPE";
pub const LAMBDA_FUNCTION_NAME_VAR: &str = "AWS_LAMBDA_FUNCTION_NAME";
pub const LAMBDA_FUNCTION_VERSION_VAR: &str = "AWS_LAMBDA_FUNCTION_VERSION";
pub const AWS_REGION_VAR: &str = "AWS_REGION";
pub const VPC_LOG_GROUP_NAME_VAR: &str = "VPC_LOG_GROUP_NAME";
pub const LOG_LEVEL_VAR: &str = "LOG_LEVEL";
pub const VPC_DEBUG_INTERVAL_VAR: &str = "VPC_DEBUG_INTERVAL";
pub const VPC_FLOW_LOG_CACHE_TTL_VAR: &str = "VPC_FLOW_LOG_CACHE_TTL_MINUTES";

pub const DEFAULT_VPC_DEBUG_INTERVAL: usize = 100;
pub const MAX_VPC_DEBUG_INTERVAL: usize = 10_000;
pub const DEFAULT_CACHE_TTL_MINUTES: u64 = 10;

#[derive(Debug, Clone)]
pub struct Config {
    pub endpoint: String,
    pub api_token: String,
    pub use_encryption: bool,
    pub executing_in_aws: bool,
    pub function_name: String,
    pub function_version: String,
    pub region: String,
    pub vpc_log_group: String,
    pub debug_enabled: bool,
    pub vpc_debug_interval: usize,
    pub cache_ttl: Duration,
}

impl Config {
    /// Loads the configuration from the environment. The endpoint and
    /// token are required; everything else has a safe default.
    pub fn from_env() -> Result<Self> {
        let executing_in_aws = env::var_os(LAMBDA_INIT_TYPE_VAR).is_some();
        let use_encryption = executing_in_aws
            && env::var(USE_ENCRYPTION_VAR)
                .map(|v| v.eq_ignore_ascii_case("yes"))
                .unwrap_or(false);

        let cfg = Self {
            endpoint: env_either(OTLP_ENDPOINT_VAR, OTLP_ENDPOINT_ALIAS_VAR),
            api_token: env_either(API_TOKEN_VAR, API_TOKEN_ALIAS_VAR),
            use_encryption,
            executing_in_aws,
            function_name: env::var(LAMBDA_FUNCTION_NAME_VAR).unwrap_or_default(),
            function_version: env::var(LAMBDA_FUNCTION_VERSION_VAR).unwrap_or_default(),
            region: env::var(AWS_REGION_VAR).unwrap_or_default(),
            vpc_log_group: env::var(VPC_LOG_GROUP_NAME_VAR).unwrap_or_default(),
            debug_enabled: env::var(LOG_LEVEL_VAR)
                .map(|v| v.eq_ignore_ascii_case("DEBUG"))
                .unwrap_or(false),
            vpc_debug_interval: parse_vpc_debug_interval(env::var(VPC_DEBUG_INTERVAL_VAR).ok()),
            cache_ttl: parse_cache_ttl(env::var(VPC_FLOW_LOG_CACHE_TTL_VAR).ok()),
        };

        validate_required(&cfg)?;
        Ok(cfg)
    }
}

fn env_either(key: &str, alias: &str) -> String {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => value,
        _ => env::var(alias).unwrap_or_default(),
    }
}

fn validate_required(cfg: &Config) -> Result<()> {
    if cfg.endpoint.trim().is_empty() || cfg.api_token.trim().is_empty() {
        anyhow::bail!(
            "function execution parameters are not configured; set and encrypt {} and {}",
            OTLP_ENDPOINT_VAR,
            API_TOKEN_VAR
        );
    }
    Ok(())
}

/// Parses the full-JSON sampling interval, clamping to 1..=10000 and
/// falling back to the default on anything unparseable.
pub fn parse_vpc_debug_interval(raw: Option<String>) -> usize {
    let Some(raw) = raw else {
        return DEFAULT_VPC_DEBUG_INTERVAL;
    };
    if raw.is_empty() {
        return DEFAULT_VPC_DEBUG_INTERVAL;
    }

    let Ok(interval) = raw.parse::<i64>() else {
        error!(value = %raw, "VPC_DEBUG_INTERVAL is not a number, using default {DEFAULT_VPC_DEBUG_INTERVAL}");
        return DEFAULT_VPC_DEBUG_INTERVAL;
    };

    if interval < 1 {
        error!(value = interval, "VPC_DEBUG_INTERVAL can't be less than 1, using default {DEFAULT_VPC_DEBUG_INTERVAL}");
        return DEFAULT_VPC_DEBUG_INTERVAL;
    }
    if interval > MAX_VPC_DEBUG_INTERVAL as i64 {
        error!(value = interval, "VPC_DEBUG_INTERVAL too large, capping at {MAX_VPC_DEBUG_INTERVAL}");
        return MAX_VPC_DEBUG_INTERVAL;
    }

    interval as usize
}

/// Parses the format-cache TTL in minutes, defaulting to 10.
pub fn parse_cache_ttl(raw: Option<String>) -> Duration {
    let minutes = raw
        .filter(|v| !v.is_empty())
        .and_then(|v| match v.parse::<u64>() {
            Ok(parsed) => Some(parsed),
            Err(_) => {
                error!(value = %v, "VPC_FLOW_LOG_CACHE_TTL_MINUTES is not a number, using default {DEFAULT_CACHE_TTL_MINUTES} minutes");
                None
            }
        })
        .unwrap_or(DEFAULT_CACHE_TTL_MINUTES);

    Duration::from_secs(minutes * 60)
}
