use std::time::Duration;

use anyhow::Result;
use colored::*;
use serde::Serialize;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::models::{ScanOutcome, ScanResult, ScanStatus};

/// One logical host row, merged from every event that named its IP.
///
/// All merging happens here, on the single consumer task; the engine never
/// holds aggregation state.
#[derive(Debug, Clone, Serialize)]
pub struct HostReport {
    pub ip: String,
    /// Every specific port that produced an event (0-port diagnostics are
    /// host-level and not listed)
    pub ports: Vec<u16>,
    pub vendor: String,
    /// Most recent status seen for this host
    pub status: ScanStatus,
    pub credentials: String,
    /// Sticky: once any event confirmed credentials, the row stays a hit
    pub success: bool,
}

/// Folds one event into the rows, keyed by IP, preserving first-seen order.
pub fn merge_event(rows: &mut Vec<HostReport>, event: &ScanResult) {
    if let Some(row) = rows.iter_mut().find(|row| row.ip == event.ip) {
        if event.port != 0 && !row.ports.contains(&event.port) {
            row.ports.push(event.port);
        }
        if !event.vendor.is_empty() {
            row.vendor = event.vendor.clone();
        }
        row.status = event.status;
        if !event.credentials.is_empty() {
            row.credentials = event.credentials.clone();
        }
        row.success |= event.success;
    } else {
        rows.push(HostReport {
            ip: event.ip.clone(),
            ports: if event.port != 0 { vec![event.port] } else { Vec::new() },
            vendor: event.vendor.clone(),
            status: event.status,
            credentials: event.credentials.clone(),
            success: event.success,
        });
    }
}

/// Drains the result stream until the engine drops its senders, printing
/// events as they arrive and returning the merged host rows.
pub async fn consume_results(
    mut rx: UnboundedReceiver<ScanResult>,
    verbose: bool,
) -> Vec<HostReport> {
    let mut rows: Vec<HostReport> = Vec::new();

    while let Some(event) = rx.recv().await {
        if event.success {
            println!(
                "{} {}:{} {} {}",
                "[+]".green().bold(),
                event.ip,
                event.port,
                event.status,
                event.credentials.yellow()
            );
        } else if verbose {
            let details = event.details.as_deref().unwrap_or("");
            println!(
                "{}",
                format!(
                    "[.] {}:{} {} {} {}",
                    event.ip, event.port, event.status, event.credentials, details
                )
                .dimmed()
            );
        }
        merge_event(&mut rows, &event);
    }

    rows
}

/// Renders the merged rows and a closing summary line.
pub fn print_report(
    rows: &[HostReport],
    outcome: ScanOutcome,
    elapsed: Duration,
    json: bool,
) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(rows)?);
        return Ok(());
    }

    let successes = rows.iter().filter(|row| row.success).count();

    if !rows.is_empty() {
        println!();
        let header = format!(
            "{:<16} {:<16} {:<22} {:<18} {}",
            "Target IP", "Port(s)", "Vendor", "Status", "Credentials"
        );
        println!("{}", header.bold());
        for row in rows {
            let ports = row
                .ports
                .iter()
                .map(|port| port.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            let creds = if row.credentials.is_empty() { "N/A" } else { row.credentials.as_str() };
            let line = format!(
                "{:<16} {:<16} {:<22} {:<18} {}",
                row.ip,
                ports,
                row.vendor,
                row.status.to_string(),
                creds
            );
            if row.success {
                println!("{}", line.green());
            } else {
                println!("{}", line);
            }
        }
    }

    println!();
    match outcome {
        ScanOutcome::Completed => println!(
            "Scan complete in {:.1}s. {} hosts seen, {} successes.",
            elapsed.as_secs_f64(),
            rows.len(),
            successes
        ),
        ScanOutcome::Cancelled => println!(
            "Scan cancelled after {:.1}s. {} hosts seen, {} successes.",
            elapsed.as_secs_f64(),
            rows.len(),
            successes
        ),
    }

    Ok(())
}
