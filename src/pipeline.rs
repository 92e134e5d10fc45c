//! Per-invocation pipeline: transform the delivered batch and ship it.
//!
//! Mode A turns log events into resource-scoped OTLP logs payloads,
//! flushing whenever the host or container identity changes. Mode B
//! (selected when the log group is the configured VPC flow-log group)
//! turns each record into a metrics envelope instead.

use anyhow::{anyhow, Result};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::classify::{classify, ClassifiedEvent, ContainerAppLog};
use crate::event::LogsBatch;
use crate::exporter::OtlpExporter;
use crate::flow_format::FlowLogFormatSource;
use crate::flow_handler::FlowLogHandler;
use crate::otlp::LogsData;
use crate::request_builder::{OtlpRequestBuilder, SW_K8S_LOG_TYPE};

/// Log-event timestamps arrive in milliseconds; OTLP wants nanoseconds.
pub const TIMESTAMP_MULTIPLIER: i64 = 1_000_000;

const PAYLOAD_CHANNEL_CAPACITY: usize = 16;

/// Handles one delivery. Returns "success", or the last export error when
/// any outbound request failed.
pub async fn handle_log_batch<S: FlowLogFormatSource>(
    batch: &LogsBatch,
    exporter: &OtlpExporter,
    vpc_log_group: &str,
    flow_handler: Option<&FlowLogHandler<S>>,
    fallback_region: &str,
    default_manifest_version: &str,
    cancel: &CancellationToken,
) -> Result<String> {
    let flow_handler = if !vpc_log_group.is_empty() && batch.log_group == vpc_log_group {
        flow_handler
    } else {
        None
    };

    let mut errors = match flow_handler {
        Some(handler) => process_flow_logs(batch, handler, exporter, cancel).await,
        None => process_logs(batch, exporter, fallback_region, default_manifest_version, cancel).await,
    };

    if errors.is_empty() {
        info!(result = "success", "function execution result");
        Ok("success".to_string())
    } else {
        info!(result = "failure", "function execution result");
        Err(anyhow!(errors.pop().unwrap_or_else(|| "export failed".to_string())))
    }
}

/// Mode A: transform into logs payloads and export them as they close.
async fn process_logs(
    batch: &LogsBatch,
    exporter: &OtlpExporter,
    fallback_region: &str,
    default_manifest_version: &str,
    cancel: &CancellationToken,
) -> Vec<String> {
    let (tx, mut rx) = mpsc::channel(PAYLOAD_CHANNEL_CAPACITY);
    let transform = transform_log_events(batch, fallback_region, default_manifest_version, tx);

    let exports = async {
        let mut errors = Vec::new();
        while let Some(payload) = rx.recv().await {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    rx.close();
                    errors.push("cancelled before log export".to_string());
                    break;
                }
                result = exporter.export_logs(&payload) => {
                    if let Err(err) = result {
                        error!(error = %err, "while exporting log data");
                        errors.push(err.to_string());
                    }
                }
            }
        }
        errors
    };

    let ((), errors) = tokio::join!(transform, exports);
    errors
}

/// Mode B: transform into metrics envelopes and export them one by one.
async fn process_flow_logs<S: FlowLogFormatSource>(
    batch: &LogsBatch,
    handler: &FlowLogHandler<S>,
    exporter: &OtlpExporter,
    cancel: &CancellationToken,
) -> Vec<String> {
    let (tx, mut rx) = mpsc::channel(PAYLOAD_CHANNEL_CAPACITY);
    let transform = handler.transform(
        &batch.owner,
        &batch.log_group,
        &batch.log_stream,
        &batch.log_events,
        cancel,
        tx,
    );

    let exports = async {
        let mut exported = 0usize;
        let mut errors = Vec::new();
        while let Some(metrics) = rx.recv().await {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    rx.close();
                    errors.push("cancelled before metric export".to_string());
                    break;
                }
                result = exporter.export_metrics(&metrics) => {
                    match result {
                        Ok(()) => exported += 1,
                        Err(err) => {
                            error!(error = %err, "while exporting metric data");
                            errors.push(err.to_string());
                        }
                    }
                }
            }
        }
        (exported, errors)
    };

    let ((), (exported, mut errors)) = tokio::join!(transform, exports);

    if exported == 0 && !batch.log_events.is_empty() {
        let message = format!(
            "failed to process any VPC flow log records from {} log events",
            batch.log_events.len()
        );
        error!("{message}");
        errors.push(message);
    }

    errors
}

/// Transforms a batch of log events into one or more logs payloads,
/// emitting a payload whenever the accumulated host or container identity
/// no longer matches the incoming record. Payloads with no records are
/// never emitted.
pub async fn transform_log_events(
    batch: &LogsBatch,
    fallback_region: &str,
    default_manifest_version: &str,
    tx: mpsc::Sender<LogsData>,
) {
    let mut builder = new_builder(batch);

    for item in &batch.log_events {
        let timestamp = item.timestamp * TIMESTAMP_MULTIPLIER;
        let event = classify(&item.message);

        if !event.is_unknown() {
            if let Some(instance_id) = event.instance_id() {
                if !builder.has_host_id() {
                    builder.set_host_id(&instance_id);
                } else if !builder.match_host_id(&instance_id) {
                    if flush(&mut builder, batch, &tx).await.is_err() {
                        return;
                    }
                    builder.set_host_id(&instance_id);
                }
            }

            match &event {
                ClassifiedEvent::AppLog(app_log) if app_log.is_fargate() => {
                    if !builder.has_container_name() {
                        set_kubernetes_info(&mut builder, app_log, default_manifest_version);
                    } else if !builder.match_container_name(
                        &app_log.cluster_uid,
                        &app_log.kubernetes.namespace_name,
                        &app_log.kubernetes.pod_name,
                        &app_log.kubernetes.container_name,
                    ) {
                        // New container: ship the previous container's logs.
                        if flush(&mut builder, batch, &tx).await.is_err() {
                            return;
                        }
                        set_kubernetes_info(&mut builder, app_log, default_manifest_version);
                    }

                    builder.add_log_entry(
                        &item.id,
                        timestamp,
                        &app_log.log,
                        event.region(),
                        &[(SW_K8S_LOG_TYPE, &app_log.log_type)],
                    );
                }
                _ => {
                    builder.add_log_entry(&item.id, timestamp, &item.message, event.region(), &[]);
                }
            }
            continue;
        }

        // Unclassified records must not ride along under the previous
        // host's identity once the stream no longer matches it.
        if builder.has_host_id() && !builder.match_host_id(&batch.log_stream) {
            if flush(&mut builder, batch, &tx).await.is_err() {
                return;
            }
            builder.add_log_entry(&item.id, timestamp, &item.message, fallback_region, &[]);
            continue;
        }

        builder.add_log_entry(&item.id, timestamp, &item.message, fallback_region, &[]);
    }

    if builder.entry_count() > 0 {
        let _ = tx.send(builder.build()).await;
    }
}

/// Emits the builder's payload when it holds any records and replaces it
/// with a fresh one pre-populated from the batch identity. Returns an
/// error once the receiving side has gone away.
async fn flush(
    builder: &mut OtlpRequestBuilder,
    batch: &LogsBatch,
    tx: &mpsc::Sender<LogsData>,
) -> Result<(), mpsc::error::SendError<LogsData>> {
    let previous = std::mem::replace(builder, new_builder(batch));
    if previous.entry_count() > 0 {
        tx.send(previous.build()).await?;
    }
    Ok(())
}

fn new_builder(batch: &LogsBatch) -> OtlpRequestBuilder {
    let mut builder = OtlpRequestBuilder::new();
    builder
        .set_cloud_account(&batch.owner)
        .set_log_group(&batch.log_group)
        .set_log_stream(&batch.log_stream);
    builder
}

fn set_kubernetes_info(
    builder: &mut OtlpRequestBuilder,
    app_log: &ContainerAppLog,
    default_manifest_version: &str,
) {
    builder
        .set_kubernetes_pod_name(&app_log.kubernetes.pod_name)
        .set_kubernetes_namespace_name(&app_log.kubernetes.namespace_name)
        .set_kubernetes_pod_uid(&app_log.kubernetes.pod_id)
        .set_kubernetes_container_name(&app_log.kubernetes.container_name)
        .set_kubernetes_container_id(&app_log.kubernetes.docker_id)
        .set_kubernetes_container_image(&app_log.kubernetes.container_image)
        .set_kubernetes_cluster_uid(&app_log.cluster_uid)
        .set_kubernetes_node_name(&app_log.kubernetes.host)
        .set_kubernetes_pod_labels(&app_log.kubernetes.labels)
        .set_kubernetes_pod_annotations(&app_log.kubernetes.annotations)
        .set_kubernetes_manifest_version(&app_log.manifest_version, default_manifest_version)
        .set_otel_attributes(&app_log.kubernetes.pod_name, &app_log.kubernetes.container_name);
}
