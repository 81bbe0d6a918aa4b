use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// What happened during a single probe or attempt.
///
/// The serialized/displayed form is the fixed vocabulary consumers key on.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScanStatus {
    /// A credential pair was confirmed against an HTTP management interface
    #[serde(rename = "HTTP Authenticated")]
    HttpAuthenticated,
    /// A credential pair was confirmed against an RTSP service
    #[serde(rename = "RTSP Authenticated")]
    RtspAuthenticated,
    /// An HTTP credential attempt completed without a classifiable success
    #[serde(rename = "Auth Attempted")]
    AuthAttempted,
    /// An HTTP credential attempt failed outright (timeout, reset, TLS)
    #[serde(rename = "HTTP Attempt Error")]
    HttpAttemptError,
    /// A host task failed unexpectedly; reported instead of aborting the scan
    #[serde(rename = "Scan Error")]
    ScanError,
}

impl fmt::Display for ScanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanStatus::HttpAuthenticated => write!(f, "HTTP Authenticated"),
            ScanStatus::RtspAuthenticated => write!(f, "RTSP Authenticated"),
            ScanStatus::AuthAttempted => write!(f, "Auth Attempted"),
            ScanStatus::HttpAttemptError => write!(f, "HTTP Attempt Error"),
            ScanStatus::ScanError => write!(f, "Scan Error"),
        }
    }
}

impl FromStr for ScanStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "HTTP Authenticated" => Ok(ScanStatus::HttpAuthenticated),
            "RTSP Authenticated" => Ok(ScanStatus::RtspAuthenticated),
            "Auth Attempted" => Ok(ScanStatus::AuthAttempted),
            "HTTP Attempt Error" => Ok(ScanStatus::HttpAttemptError),
            "Scan Error" => Ok(ScanStatus::ScanError),
            _ => Err(format!("Unknown scan status: {}", s)),
        }
    }
}

/// One result event streamed from the engine to the consumer.
///
/// Events are immutable and self-contained; a host may produce several
/// diagnostic events before (or without) a success event, and consumers
/// aggregate by `ip`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResult {
    /// Dotted-quad address of the probed host
    pub ip: String,
    /// Probed port; 0 marks a host-level diagnostic with no specific port
    pub port: u16,
    /// Best-effort device label: `Server` header, an "RTSP Device" tag, or
    /// an internal component name on error diagnostics
    pub vendor: String,
    pub status: ScanStatus,
    /// `user:pass` when a credential pair was involved, empty otherwise
    pub credentials: String,
    /// True only when a credential pair was confirmed to authenticate
    pub success: bool,
    /// Free-form diagnostic context (error message, classification evidence)
    pub details: Option<String>,
}

impl ScanResult {
    /// A confirmed credential hit on a live port.
    pub fn authenticated(
        ip: &str,
        port: u16,
        vendor: String,
        status: ScanStatus,
        credentials: &Credential,
    ) -> Self {
        Self {
            ip: ip.to_string(),
            port,
            vendor,
            status,
            credentials: credentials.to_string(),
            success: true,
            details: None,
        }
    }

    /// A non-success event reported purely for observability.
    pub fn diagnostic(
        ip: &str,
        port: u16,
        vendor: &str,
        status: ScanStatus,
        credentials: String,
        details: String,
    ) -> Self {
        Self {
            ip: ip.to_string(),
            port,
            vendor: vendor.to_string(),
            status,
            credentials,
            success: false,
            details: Some(details),
        }
    }
}

/// A username/password pair attempted against a discovered service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub user: String,
    pub pass: String,
}

impl Credential {
    pub fn new(user: &str, pass: &str) -> Self {
        Self {
            user: user.to_string(),
            pass: pass.to_string(),
        }
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.user, self.pass)
    }
}

impl FromStr for Credential {
    type Err = String;

    /// Parses `user:pass`; a missing `:` means an empty password.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err("empty credential entry".to_string());
        }
        match s.split_once(':') {
            Some((user, pass)) => Ok(Credential::new(user, pass)),
            None => Ok(Credential::new(s, "")),
        }
    }
}

/// Terminal outcome of a whole scan, distinct from per-host errors.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    /// All hosts were processed
    Completed,
    /// The cancellation signal was observed before all hosts were processed
    Cancelled,
}

impl fmt::Display for ScanOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanOutcome::Completed => write!(f, "completed"),
            ScanOutcome::Cancelled => write!(f, "cancelled"),
        }
    }
}
