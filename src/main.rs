use anyhow::{Context, Result};
use breakerwatch::duration::format_duration;
use breakerwatch::runtime;
use breakerwatch::{Args, RelayConfig};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Registry};

fn main() -> Result<()> {
    let args = Args::parse();
    let config = RelayConfig::load(&args)?;

    // Records go to stdout, so logs go to stderr.
    Registry::default()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .init();

    runtime::block_on(run(config), runtime::SHUTDOWN_GRACE)
}

async fn run(config: RelayConfig) -> Result<()> {
    info!(
        source = %config.source.description(),
        output = %config.output.description(),
        window = %format_duration(config.window),
        "Starting relay"
    );

    let input = config
        .source
        .open(config.connect_timeout)
        .await
        .with_context(|| format!("Failed to open {}", config.source.description()))?;

    let pipeline = config.pipeline();
    let output_description = config.output.description();
    let sink = config
        .output
        .open()
        .await
        .with_context(|| format!("Failed to open {}", output_description))?;

    let token = CancellationToken::new();
    let ctrl_c_token = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted, shutting down");
            ctrl_c_token.cancel();
        }
    });

    let report = pipeline.run(input, sink, token).await?;

    if report.skipped.total() > 0 {
        info!(
            too_short = report.skipped.too_short,
            not_data_frame = report.skipped.not_data_frame,
            malformed_payload = report.skipped.malformed_payload,
            invalid_timestamp = report.skipped.invalid_timestamp,
            serialize = report.skipped.serialize,
            invalid_utf8 = report.skipped.invalid_utf8,
            too_long = report.skipped.too_long,
            "Some lines were skipped"
        );
    }
    info!(lines = report.lines, emitted = report.emitted, "Relay finished");

    Ok(())
}
