use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use log::warn;
use tokio::sync::mpsc;

use camsweep::output::{consume_results, print_report};
use camsweep::{CancelToken, Credential, ScanConfig, ScanEngine};

/// Sweep a /24 for camera and web management interfaces that still answer
/// to default credentials.
#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Network prefix to sweep, first three octets (hosts .1-.254 are probed)
    #[clap(default_value = "192.168.1")]
    prefix: String,

    /// Ports to probe, comma-separated
    #[clap(short, long, default_value = "80,443,554,8000,8080")]
    ports: String,

    /// Credential pairs to try, comma-separated user:pass entries
    /// (defaults to the built-in dictionary of common device defaults)
    #[clap(long)]
    creds: Option<String>,

    /// Maximum hosts scanned in parallel
    #[clap(short, long, default_value_t = 50)]
    concurrency: usize,

    /// Per-request HTTP timeout in milliseconds
    #[clap(long, default_value_t = 2000)]
    http_timeout_ms: u64,

    /// TCP port probe timeout in milliseconds
    #[clap(long, default_value_t = 500)]
    probe_timeout_ms: u64,

    /// RTSP connect timeout in milliseconds
    #[clap(long, default_value_t = 1000)]
    rtsp_timeout_ms: u64,

    /// Require valid TLS certificates on HTTPS targets (self-signed
    /// devices will then fail the baseline and credential fetches)
    #[clap(long)]
    strict_certs: bool,

    /// Show diagnostic events while scanning
    #[clap(short, long)]
    verbose: bool,

    /// Emit the merged host rows as JSON instead of a table
    #[clap(short, long)]
    json: bool,
}

fn setup_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(default_filter),
    )
    .format_timestamp_secs()
    .format_target(false)
    .init();
}

fn parse_ports(text: &str) -> Result<Vec<u16>> {
    text.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            entry
                .parse::<u16>()
                .with_context(|| format!("invalid port '{}'", entry))
        })
        .collect()
}

fn parse_creds(text: &str) -> Result<Vec<Credential>> {
    text.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            entry
                .parse::<Credential>()
                .map_err(|err| anyhow::anyhow!("invalid credential '{}': {}", entry, err))
        })
        .collect()
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    setup_logging(args.verbose);

    let mut config = ScanConfig {
        ports: parse_ports(&args.ports)?,
        max_concurrent_hosts: args.concurrency,
        http_request_timeout: Duration::from_millis(args.http_timeout_ms),
        port_probe_timeout: Duration::from_millis(args.probe_timeout_ms),
        rtsp_connect_timeout: Duration::from_millis(args.rtsp_timeout_ms),
        accept_invalid_certs: !args.strict_certs,
        ..ScanConfig::default()
    };
    if let Some(creds) = &args.creds {
        config.credentials = parse_creds(creds)?;
    }

    let engine = ScanEngine::new(config)?;
    let cancel = CancelToken::new();

    // Ctrl-C maps to the cooperative cancel signal; running host tasks wind
    // down on their own and the sweep reports a cancelled outcome.
    let interrupt = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupt received, stopping scan");
                cancel.cancel();
            }
        }
    });

    let (tx, rx) = mpsc::unbounded_channel();
    let consumer = tokio::spawn(consume_results(rx, args.verbose));

    let started = Instant::now();
    let outcome = engine.scan(&args.prefix, tx, cancel).await?;
    let rows = consumer.await.context("result consumer failed")?;

    interrupt.abort();
    print_report(&rows, outcome, started.elapsed(), args.json)?;

    engine.shutdown().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_port_lists() {
        assert_eq!(parse_ports("80,443, 8080").unwrap(), vec![80, 443, 8080]);
        assert!(parse_ports("80,nope").is_err());
    }

    #[test]
    fn parses_credential_lists() {
        let creds = parse_creds("admin:admin, root:pass,admin:").unwrap();
        assert_eq!(creds.len(), 3);
        assert_eq!(creds[2].user, "admin");
        assert_eq!(creds[2].pass, "");
    }
}
