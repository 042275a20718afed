//! pipeforge binary.

use anyhow::Context;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Builds the log filter. `RUST_LOG` wins; otherwise `--log-level` is used,
/// and a malformed level is reported instead of silently ignored.
fn log_filter(cli_level: &str) -> anyhow::Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(cli_level).with_context(|| format!("Invalid --log-level '{}'", cli_level))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = pipeforge::cli::parse_cli();

    // Logs go to stderr so `--json` output on stdout stays parseable.
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(log_filter(&cli.log_level)?)
        .init();

    pipeforge::cli::run_with_cli(cli).await
}
