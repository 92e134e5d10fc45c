//! Flow-log format discovery against the EC2 API.

use anyhow::{anyhow, Context, Result};
use aws_sdk_ec2::types::Filter;
use aws_sdk_ec2::Client as Ec2Client;
use std::future::Future;

/// The format configuration attached to a log group's flow logs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlowLogFormat {
    pub log_format: String,
    pub flow_log_id: String,
    pub flow_log_count: usize,
}

/// Where flow-log formats come from. The handler is generic over this so
/// tests can inject canned formats without an AWS account.
pub trait FlowLogFormatSource {
    fn describe(&self, log_group: &str) -> impl Future<Output = Result<FlowLogFormat>> + Send;
}

/// DescribeFlowLogs-backed source. When several flow logs match the log
/// group the first one wins; the count is reported so callers can warn.
#[derive(Debug, Clone)]
pub struct Ec2FormatSource {
    client: Ec2Client,
}

impl Ec2FormatSource {
    pub fn new(client: Ec2Client) -> Self {
        Self { client }
    }
}

impl FlowLogFormatSource for Ec2FormatSource {
    async fn describe(&self, log_group: &str) -> Result<FlowLogFormat> {
        let result = self
            .client
            .describe_flow_logs()
            .filter(
                Filter::builder()
                    .name("log-group-name")
                    .values(log_group)
                    .build(),
            )
            .send()
            .await
            .context("failed to describe flow logs")?;

        let flow_logs = result.flow_logs();
        let first = flow_logs
            .first()
            .ok_or_else(|| anyhow!("no flow logs found for log group: {log_group}"))?;

        Ok(FlowLogFormat {
            log_format: first.log_format().unwrap_or_default().to_string(),
            flow_log_id: first.flow_log_id().unwrap_or_default().to_string(),
            flow_log_count: flow_logs.len(),
        })
    }
}
