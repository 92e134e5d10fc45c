//! Mode B: turns a batch of flow-log events into metrics envelopes.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::Result;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::event::LogEvent;
use crate::flow_format::{FlowLogFormat, FlowLogFormatSource};
use crate::flow_metrics::build_metrics;
use crate::flow_parser::{parse_custom, parse_default};
use crate::flow_record::is_default_format;
use crate::format_cache::FlowLogFormatCache;
use crate::otlp::MetricsData;
use crate::protocol::convert_protocol;

/// Default full-JSON sampling interval under debug logging.
pub const DEFAULT_DEBUG_INTERVAL: usize = 100;

/// Per-process flow-log handler: owns the format cache and the debug
/// sampling state, and drives parse → validate → metrics per record.
pub struct FlowLogHandler<S> {
    debug_enabled: bool,
    debug_interval: usize,
    debug_counter: AtomicUsize,
    format_cache: FlowLogFormatCache,
    source: S,
}

impl<S: FlowLogFormatSource> FlowLogHandler<S> {
    pub fn new(debug_enabled: bool, debug_interval: usize, cache_ttl: Duration, source: S) -> Self {
        let debug_interval = if debug_interval == 0 {
            DEFAULT_DEBUG_INTERVAL
        } else {
            debug_interval
        };
        Self {
            debug_enabled,
            debug_interval,
            debug_counter: AtomicUsize::new(0),
            format_cache: FlowLogFormatCache::new(cache_ttl),
            source,
        }
    }

    /// Resolves the flow-log format for a log group, consulting the cache
    /// before the API collaborator.
    pub async fn resolve_format(&self, log_group: &str) -> Result<FlowLogFormat> {
        if let Some((log_format, flow_log_id, flow_log_count)) = self.format_cache.get(log_group) {
            return Ok(FlowLogFormat {
                log_format,
                flow_log_id,
                flow_log_count,
            });
        }

        let format = self.source.describe(log_group).await?;
        self.format_cache.set(
            log_group,
            &format.log_format,
            &format.flow_log_id,
            format.flow_log_count,
        );
        Ok(format)
    }

    /// Transforms every event in the batch into a metrics envelope and
    /// pushes it downstream. Records that fail to parse or validate are
    /// dropped and logged; cancellation is honored at record boundaries.
    /// Dropping `tx` on return closes the output channel.
    pub async fn transform(
        &self,
        account: &str,
        log_group: &str,
        log_stream: &str,
        events: &[LogEvent],
        cancel: &CancellationToken,
        tx: mpsc::Sender<MetricsData>,
    ) {
        let format = match self.resolve_format(log_group).await {
            Ok(format) => format,
            Err(err) => {
                error!(log_group, error = %format!("{err:#}"), "while getting flow log format");
                return;
            }
        };

        if format.flow_log_count > 1 {
            warn!(
                log_group,
                flow_log_id = %format.flow_log_id,
                count = format.flow_log_count,
                "multiple flow logs found for log group, using the first one"
            );
        }

        let use_default = is_default_format(&format.log_format);
        if self.debug_enabled {
            if use_default {
                info!(records = events.len(), "using DEFAULT flow log parser");
            } else {
                info!(
                    records = events.len(),
                    format = %format.log_format,
                    "using CUSTOM flow log parser"
                );
            }
        }

        for event in events {
            if cancel.is_cancelled() {
                info!("cancellation observed, stopping flow log processing");
                return;
            }

            let parsed = if use_default {
                parse_default(&event.message)
            } else {
                parse_custom(&event.message, &format.log_format)
            };

            let record = match parsed {
                Ok(record) => record,
                Err(err) => {
                    debug!(message = %event.message, "failed flow log record");
                    error!(error = %err, "failed to parse VPC flow log record");
                    continue;
                }
            };

            let metrics = build_metrics(&record);

            if self.debug_enabled {
                let counter = self.debug_counter.fetch_add(1, Ordering::Relaxed) + 1;
                info!(
                    account,
                    log_group,
                    log_stream,
                    version = %record.version,
                    action = %record.action,
                    protocol = %record.protocol,
                    protocol_name = convert_protocol(&record.protocol),
                    "VPC flow log processed"
                );
                // Full JSON is expensive, so it is sampled.
                if counter % self.debug_interval == 1 {
                    match serde_json::to_string(&metrics) {
                        Ok(json) => info!(
                            record_id = counter,
                            interval = self.debug_interval,
                            json = %json,
                            "full metrics request (sample)"
                        ),
                        Err(err) => debug!(error = %err, "could not render metrics sample"),
                    }
                }
            }

            if tx.send(metrics).await.is_err() {
                return;
            }
        }
    }

    pub fn format_cache(&self) -> &FlowLogFormatCache {
        &self.format_cache
    }
}
