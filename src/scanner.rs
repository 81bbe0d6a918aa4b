use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use futures::stream::{FuturesUnordered, StreamExt};
use log::{debug, info, warn};
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::Semaphore;

use crate::cancel::CancelToken;
use crate::config::ScanConfig;
use crate::error::ScanError;
use crate::models::{ScanOutcome, ScanResult, ScanStatus};
use crate::techniques::{self, ENGINE_VENDOR};
use crate::utils::expand_prefix;

/// The one port handled by the RTSP tester; every other configured port is
/// treated as a web interface. The mapping is fixed, not content-sniffed.
const RTSP_PORT: u16 = 554;

/// The scan engine: expands a prefix into host addresses, fans out per-host
/// probe tasks under an admission gate, and streams [`ScanResult`] events.
///
/// The HTTP client is built once and shared read-only across all host
/// tasks; no other state is shared between them. `shutdown` releases the
/// engine exactly once and rejects later scans.
pub struct ScanEngine {
    config: Arc<ScanConfig>,
    http: reqwest::Client,
    halt: CancelToken,
    closed: AtomicBool,
}

impl ScanEngine {
    pub fn new(config: ScanConfig) -> Result<Self> {
        let config = config.normalized();

        // Redirects stay visible so a login redirect reads as a status
        // change; no cookie store, every attempt is stateless.
        let http = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            config: Arc::new(config),
            http,
            halt: CancelToken::new(),
            closed: AtomicBool::new(false),
        })
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Sweeps `prefix.1 ..= prefix.254`, streaming events into `results`.
    ///
    /// At most `max_concurrent_hosts` host tasks run at once; excess hosts
    /// wait on the admission gate. Every launched task is joined before
    /// this returns, cancelled or not. A host task that panics is reported
    /// as a `Scan Error` diagnostic instead of aborting the sweep.
    ///
    /// Returns [`ScanOutcome::Cancelled`] when `cancel` (or an engine
    /// shutdown) was observed, [`ScanOutcome::Completed`] otherwise, and
    /// [`ScanError::EngineClosed`] when called after `shutdown`.
    pub async fn scan(
        &self,
        prefix: &str,
        results: UnboundedSender<ScanResult>,
        cancel: CancelToken,
    ) -> Result<ScanOutcome, ScanError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ScanError::EngineClosed);
        }

        // Caller token and engine shutdown combined into one effective
        // signal: whichever fires first cancels the sweep.
        let linked = CancelToken::new();
        let forward = tokio::spawn({
            let linked = linked.clone();
            let caller = cancel.clone();
            let halt = self.halt.clone();
            async move {
                tokio::select! {
                    _ = caller.cancelled() => {}
                    _ = halt.cancelled() => {}
                }
                linked.cancel();
            }
        });
        // The forwarder only runs once this task yields; an already-fired
        // signal must stop issuance before the first host launches.
        if cancel.is_cancelled() || self.halt.is_cancelled() {
            linked.cancel();
        }

        info!(
            "starting sweep of {}.1-254 ({} ports, {} credential pairs, {} hosts in parallel)",
            prefix,
            self.config.ports.len(),
            self.config.credentials.len(),
            self.config.max_concurrent_hosts
        );

        let gate = Arc::new(Semaphore::new(self.config.max_concurrent_hosts));
        let mut tasks = FuturesUnordered::new();

        for host in expand_prefix(prefix) {
            if linked.is_cancelled() {
                break;
            }

            // The slot wait itself must yield to cancellation, otherwise a
            // full gate would stall the abort.
            let permit = tokio::select! {
                _ = linked.cancelled() => break,
                acquired = Arc::clone(&gate).acquire_owned() => match acquired {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            let config = Arc::clone(&self.config);
            let client = self.http.clone();
            let sender = results.clone();
            let token = linked.clone();
            let ip = host.clone();
            let handle = tokio::spawn(async move {
                // Permit rides inside the task so the slot frees on every
                // exit path: success, failure, cancellation, or panic.
                let _permit = permit;
                scan_host(config, client, ip, sender, token).await
            });
            tasks.push(async move { (host, handle.await) });
        }

        let mut interrupted = false;
        while let Some((ip, joined)) = tasks.next().await {
            match joined {
                Ok(Ok(())) => {}
                Ok(Err(ScanError::Cancelled)) => interrupted = true,
                Ok(Err(err)) => {
                    let _ = results.send(ScanResult::diagnostic(
                        &ip,
                        0,
                        ENGINE_VENDOR,
                        ScanStatus::ScanError,
                        String::new(),
                        err.to_string(),
                    ));
                }
                Err(join_err) => {
                    // A panicking host task becomes a diagnostic; the rest
                    // of the sweep is unaffected.
                    warn!("host task for {} failed: {}", ip, join_err);
                    let _ = results.send(ScanResult::diagnostic(
                        &ip,
                        0,
                        ENGINE_VENDOR,
                        ScanStatus::ScanError,
                        String::new(),
                        join_err.to_string(),
                    ));
                }
            }
        }

        forward.abort();

        if interrupted || linked.is_cancelled() {
            info!("sweep of {}.1-254 cancelled", prefix);
            Ok(ScanOutcome::Cancelled)
        } else {
            info!("sweep of {}.1-254 completed", prefix);
            Ok(ScanOutcome::Completed)
        }
    }

    /// Releases the engine. Idempotent; the first call cancels any
    /// in-flight sweep, later calls are no-ops. Scans started after this
    /// fail with [`ScanError::EngineClosed`].
    pub async fn shutdown(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.halt.cancel();
        info!("scan engine shut down");
    }
}

/// Probes one host: ports in configured order, liveness first, then the
/// protocol tester for that port. The first confirmed hit is reported and
/// ends the host; later ports stay unprobed.
async fn scan_host(
    config: Arc<ScanConfig>,
    client: reqwest::Client,
    ip: String,
    results: UnboundedSender<ScanResult>,
    cancel: CancelToken,
) -> Result<(), ScanError> {
    for &port in &config.ports {
        if cancel.is_cancelled() {
            return Err(ScanError::Cancelled);
        }

        if !techniques::port_is_open(&ip, port, config.port_probe_timeout, &cancel).await? {
            continue;
        }
        debug!("{}:{} is open", ip, port);

        let hit = if port == RTSP_PORT {
            techniques::try_rtsp_auth(&config, &ip, port, &cancel).await?
        } else {
            techniques::try_http_auth(&client, &config, &ip, port, &results, &cancel).await?
        };

        if let Some(result) = hit {
            info!("{}:{} accepted {}", ip, port, result.credentials);
            let _ = results.send(result);
            return Ok(());
        }
    }

    Ok(())
}
