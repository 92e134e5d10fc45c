//! Shared instrumentation-scope identity for outbound telemetry.

use crate::otlp::{InstrumentationScope, KeyValue};

pub const SCOPE_NAME: &str = "vpc_flow_logs";
pub const SCOPE_VERSION: &str = "1.0.0";
pub const IDENTIFIER: &str = "nio";
pub const SWI_REPORTER: &str = "";

/// Builds the instrumentation scope used for both logs and metrics so the
/// two signals stay consistent downstream.
pub fn instrumentation_scope() -> InstrumentationScope {
    InstrumentationScope {
        name: SCOPE_NAME.to_string(),
        version: SCOPE_VERSION.to_string(),
        attributes: vec![
            KeyValue::string("identifier", IDENTIFIER),
            KeyValue::string("swi-reporter", SWI_REPORTER),
        ],
    }
}
