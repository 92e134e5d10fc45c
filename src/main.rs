use std::process;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use dotenvy::dotenv;
use lambda_runtime::{service_fn, Error as LambdaError, LambdaEvent};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use otelship::config::Config;
use otelship::event::CloudwatchLogsEvent;
use otelship::exporter::OtlpExporter;
use otelship::flow_format::Ec2FormatSource;
use otelship::flow_handler::FlowLogHandler;
use otelship::pipeline;
use otelship::secrets::resolve_secrets;

/// Headroom before the invocation deadline to let exports wind down.
const DEADLINE_HEADROOM: Duration = Duration::from_millis(500);

struct App {
    cfg: Config,
    exporter: OtlpExporter,
    flow_handler: Option<FlowLogHandler<Ec2FormatSource>>,
}

#[tokio::main]
async fn main() -> Result<(), LambdaError> {
    dotenv().ok();
    init_tracing();

    let app = match init_app().await {
        Ok(app) => Arc::new(app),
        Err(err) => {
            error!(error = %format!("{err:#}"), "fatal initialization failure");
            process::exit(1);
        }
    };

    lambda_runtime::run(service_fn(move |event: LambdaEvent<CloudwatchLogsEvent>| {
        let app = app.clone();
        async move { handle_event(app, event).await }
    }))
    .await
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn init_app() -> Result<App> {
    let mut cfg = Config::from_env().context("loading configuration")?;
    resolve_secrets(&mut cfg).await?;

    let exporter =
        OtlpExporter::new(&cfg.endpoint, &cfg.api_token).context("building OTLP exporter")?;

    let flow_handler = if cfg.vpc_log_group.is_empty() {
        None
    } else {
        let aws_cfg = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        let source = Ec2FormatSource::new(aws_sdk_ec2::Client::new(&aws_cfg));
        Some(FlowLogHandler::new(
            cfg.debug_enabled,
            cfg.vpc_debug_interval,
            cfg.cache_ttl,
            source,
        ))
    };

    Ok(App {
        cfg,
        exporter,
        flow_handler,
    })
}

async fn handle_event(
    app: Arc<App>,
    event: LambdaEvent<CloudwatchLogsEvent>,
) -> Result<String, LambdaError> {
    let cancel = deadline_token(event.context.deadline);

    let batch = event.payload.awslogs.decode().map_err(|err| {
        error!(error = %format!("{err:#}"), "while parsing cloudwatch log event");
        LambdaError::from(err)
    })?;

    info!(
        log_group = %batch.log_group,
        log_stream = %batch.log_stream,
        events = batch.log_events.len(),
        "processing delivery"
    );

    let result = pipeline::handle_log_batch(
        &batch,
        &app.exporter,
        &app.cfg.vpc_log_group,
        app.flow_handler.as_ref(),
        &app.cfg.region,
        &app.cfg.function_version,
        &cancel,
    )
    .await?;

    Ok(result)
}

/// A token that fires shortly before the invocation deadline. A zero
/// deadline (not running under the managed environment) never fires.
fn deadline_token(deadline_ms: u64) -> CancellationToken {
    let token = CancellationToken::new();
    if deadline_ms == 0 {
        return token;
    }

    let now_ms = chrono::Utc::now().timestamp_millis().max(0) as u64;
    let remaining =
        Duration::from_millis(deadline_ms.saturating_sub(now_ms)).saturating_sub(DEADLINE_HEADROOM);

    let timer = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(remaining).await;
        timer.cancel();
    });
    token
}
