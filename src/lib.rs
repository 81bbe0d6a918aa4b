//! Subnet sweeper for camera and web management interfaces.
//!
//! An operator supplies a dotted 3-octet prefix; the engine expands it to
//! the 254 host addresses, checks a small fixed set of management ports for
//! liveness, and tries a dictionary of well-known default credentials
//! against whatever answers — HTTP Basic for web ports, a single RTSP
//! DESCRIBE for port 554. Results stream to the caller as immutable events;
//! all aggregation belongs to the consumer.
//!
//! Audit tooling: run it only against networks you are authorized to test.

pub mod cancel;
pub mod config;
pub mod error;
pub mod models;
pub mod output;
pub mod scanner;
pub mod techniques;
pub mod utils;

pub use cancel::CancelToken;
pub use config::ScanConfig;
pub use error::ScanError;
pub use models::{Credential, ScanOutcome, ScanResult, ScanStatus};
pub use scanner::ScanEngine;
