use std::time::Duration;

use clap::Parser;
use tracing::error;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use vaultctl::readiness::ReadinessProbe;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Wait until an HTTP endpoint reports healthy",
    long_about = None
)]
struct Args {
    /// URL to poll
    url: String,

    /// Give up once this much time has passed (e.g. 30s, 2m)
    #[arg(long, value_parser = humantime::parse_duration, default_value = "1m")]
    timeout: Duration,

    /// Delay between attempts
    #[arg(long, value_parser = humantime::parse_duration, default_value = "10s")]
    interval: Duration,
}

#[tokio::main]
async fn main() {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let probe = match ReadinessProbe::new(args.timeout, args.interval) {
        Ok(probe) => probe,
        Err(err) => {
            error!("{err}");
            std::process::exit(1);
        }
    };
    if let Err(err) = probe.wait_until_ready(&args.url).await {
        error!("Timeout reached. Service is not responding: {err}");
        std::process::exit(1);
    }
}
