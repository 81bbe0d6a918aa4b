use std::time::Duration;

use anyhow::{anyhow, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use log::debug;
use reqwest::header::SERVER;
use reqwest::StatusCode;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc::UnboundedSender;
use tokio::time::timeout;

use crate::cancel::CancelToken;
use crate::config::ScanConfig;
use crate::error::ScanError;
use crate::models::{Credential, ScanResult, ScanStatus};
use crate::utils::trim_sample;

/// Response bytes kept for the baseline/authenticated content diff. Full
/// bodies are not needed for diffing and the cap bounds memory use.
const MAX_SAMPLE_BYTES: usize = 4096;

/// RTSP response buffer size.
const RTSP_READ_BUF: usize = 2048;

/// Label used when a web server does not identify itself.
const GENERIC_WEB_VENDOR: &str = "Generic Web Server";

/// Internal component name carried by attempt-error diagnostics.
pub(crate) const ENGINE_VENDOR: &str = "ScanEngine";

/// TCP-connect liveness check.
///
/// True only if the connection is established before the probe timer fires.
/// Refusal, unreachability, and timeout all read as "not open"; only the
/// cancel signal turns into an error, so callers can tell "port closed"
/// from "scan aborted".
pub async fn port_is_open(
    ip: &str,
    port: u16,
    probe_timeout: Duration,
    cancel: &CancelToken,
) -> Result<bool, ScanError> {
    let addr = format!("{}:{}", ip, port);
    tokio::select! {
        _ = cancel.cancelled() => Err(ScanError::Cancelled),
        connected = timeout(probe_timeout, TcpStream::connect(&addr)) => {
            Ok(matches!(connected, Ok(Ok(_))))
        }
    }
}

/// Status code, server identification, and a capped body sample from one
/// HTTP exchange.
struct HttpPage {
    status: StatusCode,
    server: Option<String>,
    sample: Vec<u8>,
}

/// One GET under the per-request timer, raced against the cancel signal.
///
/// The outer error is cancellation; the inner result carries ordinary
/// request failures (timeout, reset, TLS) for the caller to absorb.
async fn fetch_page(
    client: &reqwest::Client,
    url: &str,
    auth: Option<&Credential>,
    request_timeout: Duration,
    cancel: &CancelToken,
) -> Result<Result<HttpPage>, ScanError> {
    let exchange = async {
        let mut request = client.get(url);
        if let Some(cred) = auth {
            request = request.basic_auth(&cred.user, Some(&cred.pass));
        }
        let response = request.send().await?;
        let status = response.status();
        let server = response
            .headers()
            .get(SERVER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        let body = response.bytes().await?;
        Ok(HttpPage {
            status,
            server,
            sample: trim_sample(&body, MAX_SAMPLE_BYTES),
        })
    };

    tokio::select! {
        _ = cancel.cancelled() => Err(ScanError::Cancelled),
        fetched = timeout(request_timeout, exchange) => Ok(match fetched {
            Ok(page) => page,
            Err(_) => Err(anyhow!("request timed out after {:?}", request_timeout)),
        }),
    }
}

/// HTTP default-credential test against `ip:port`.
///
/// Fetches the page once without credentials, then walks the configured
/// pairs comparing each authenticated response against that baseline.
/// Status codes alone are not enough for embedded devices that answer 200
/// to everything, hence the capped content comparison. Returns the
/// confirmed hit, or `None` when no pair classifies as a success.
/// Non-success attempts surface as diagnostic events on `diagnostics`.
pub async fn try_http_auth(
    client: &reqwest::Client,
    config: &ScanConfig,
    ip: &str,
    port: u16,
    diagnostics: &UnboundedSender<ScanResult>,
    cancel: &CancelToken,
) -> Result<Option<ScanResult>, ScanError> {
    let scheme = if port == 443 { "https" } else { "http" };
    let url = format!("{}://{}:{}/", scheme, ip, port);

    // Baseline without credentials. Some devices reject any unauthenticated
    // request outright, so a failed baseline must not block the credential
    // loop; it just leaves nothing to diff against.
    let baseline = match fetch_page(client, &url, None, config.http_request_timeout, cancel).await?
    {
        Ok(page) => Some(page),
        Err(err) => {
            debug!("{} baseline fetch failed: {}", url, err);
            None
        }
    };
    let baseline_status = baseline.as_ref().map(|page| page.status);
    let baseline_sample: &[u8] = baseline.as_ref().map(|page| page.sample.as_slice()).unwrap_or(&[]);

    for cred in &config.credentials {
        if cancel.is_cancelled() {
            return Err(ScanError::Cancelled);
        }

        let authed =
            match fetch_page(client, &url, Some(cred), config.http_request_timeout, cancel).await? {
                Ok(page) => page,
                Err(err) => {
                    // Transient failure on one pair must not abort the rest.
                    let _ = diagnostics.send(ScanResult::diagnostic(
                        ip,
                        port,
                        ENGINE_VENDOR,
                        ScanStatus::HttpAttemptError,
                        cred.to_string(),
                        err.to_string(),
                    ));
                    continue;
                }
            };

        // Explicit 401 means the pair was rejected.
        if authed.status == StatusCode::UNAUTHORIZED {
            continue;
        }

        let vendor = authed
            .server
            .clone()
            .unwrap_or_else(|| GENERIC_WEB_VENDOR.to_string());

        // Baseline demanded auth and this pair got through.
        if baseline_status == Some(StatusCode::UNAUTHORIZED) && authed.status.is_success() {
            return Ok(Some(ScanResult::authenticated(
                ip,
                port,
                vendor,
                ScanStatus::HttpAuthenticated,
                cred,
            )));
        }

        // Same-status devices often vary page content between the login
        // form and the authenticated view; a changed sample counts as a
        // state change when the status alone shows none.
        let content_differs = baseline_sample != authed.sample.as_slice();
        if authed.status.is_success() && (Some(authed.status) != baseline_status || content_differs)
        {
            return Ok(Some(ScanResult::authenticated(
                ip,
                port,
                vendor,
                ScanStatus::HttpAuthenticated,
                cred,
            )));
        }

        // No observable change; keep the evidence around for the consumer.
        let baseline_text = baseline_status
            .map(|status| status.to_string())
            .unwrap_or_else(|| "none".to_string());
        let _ = diagnostics.send(ScanResult::diagnostic(
            ip,
            port,
            &vendor,
            ScanStatus::AuthAttempted,
            cred.to_string(),
            format!(
                "auth status {}, baseline status {}, content differs: {}",
                authed.status, baseline_text, content_differs
            ),
        ));
    }

    Ok(None)
}

/// RTSP default-credential test against `ip:port`.
///
/// One DESCRIBE per pair over a fresh connection; connection, write, and
/// read failures count as a failed attempt for that pair only.
pub async fn try_rtsp_auth(
    config: &ScanConfig,
    ip: &str,
    port: u16,
    cancel: &CancelToken,
) -> Result<Option<ScanResult>, ScanError> {
    for cred in &config.credentials {
        if cancel.is_cancelled() {
            return Err(ScanError::Cancelled);
        }

        let attempt = tokio::select! {
            _ = cancel.cancelled() => return Err(ScanError::Cancelled),
            attempted = rtsp_describe(ip, port, cred, config.rtsp_connect_timeout) => attempted,
        };

        match attempt {
            Ok(true) => {
                return Ok(Some(ScanResult::authenticated(
                    ip,
                    port,
                    "RTSP Device".to_string(),
                    ScanStatus::RtspAuthenticated,
                    cred,
                )));
            }
            Ok(false) => continue,
            Err(err) => {
                debug!("rtsp attempt {}:{} as {} failed: {}", ip, port, cred.user, err);
                continue;
            }
        }
    }

    Ok(None)
}

/// Sends a single authenticated DESCRIBE and classifies the response.
async fn rtsp_describe(
    ip: &str,
    port: u16,
    cred: &Credential,
    connect_timeout: Duration,
) -> Result<bool> {
    let addr = format!("{}:{}", ip, port);
    let mut stream = match timeout(connect_timeout, TcpStream::connect(&addr)).await {
        Ok(connected) => connected?,
        Err(_) => return Err(anyhow!("connect to {} timed out", addr)),
    };

    let auth = BASE64.encode(format!("{}:{}", cred.user, cred.pass));
    let request = format!(
        "DESCRIBE rtsp://{}:{} RTSP/1.0\r\nCSeq: 1\r\nAuthorization: Basic {}\r\n\r\n",
        ip, port, auth
    );
    stream.write_all(request.as_bytes()).await?;

    // Devices can be slow to answer DESCRIBE; give the read at least a
    // second even when the connect budget is tighter.
    let read_timeout = connect_timeout.max(Duration::from_millis(1000));
    let mut buf = [0u8; RTSP_READ_BUF];
    let read = match timeout(read_timeout, stream.read(&mut buf)).await {
        Ok(done) => done?,
        Err(_) => return Err(anyhow!("read from {} timed out", addr)),
    };
    if read == 0 {
        return Ok(false);
    }

    let response = String::from_utf8_lossy(&buf[..read]);
    Ok(response.contains("RTSP/1.0 200") || response.contains("RTSP/1.0 302"))
}
