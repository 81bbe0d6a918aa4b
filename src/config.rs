use std::time::Duration;

use crate::models::Credential;

/// Management ports probed when the operator supplies none.
pub const DEFAULT_PORTS: [u16; 5] = [80, 443, 554, 8000, 8080];

/// Default credential dictionary, in probing priority order.
pub fn default_credentials() -> Vec<Credential> {
    vec![
        Credential::new("admin", "admin"),
        Credential::new("admin", "123456"),
        Credential::new("admin", "password"),
        Credential::new("root", "pass"),
        Credential::new("admin", ""),
    ]
}

/// Engine configuration, read-only after construction.
///
/// Ports and credentials are ordered: within a host, ports are tried in
/// this order and credentials in this order, first confirmed success wins.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub ports: Vec<u16>,
    pub credentials: Vec<Credential>,
    /// Upper bound on simultaneously scanned hosts
    pub max_concurrent_hosts: usize,
    /// Hard per-request budget for each HTTP fetch
    pub http_request_timeout: Duration,
    /// TCP connect budget for the liveness probe
    pub port_probe_timeout: Duration,
    /// TCP connect budget for the RTSP probe; the read budget is this or
    /// one second, whichever is larger
    pub rtsp_connect_timeout: Duration,
    /// Skip TLS peer validation on HTTPS targets; embedded devices are
    /// commonly self-signed
    pub accept_invalid_certs: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            ports: DEFAULT_PORTS.to_vec(),
            credentials: default_credentials(),
            max_concurrent_hosts: 50,
            http_request_timeout: Duration::from_secs(2),
            port_probe_timeout: Duration::from_millis(500),
            rtsp_connect_timeout: Duration::from_millis(1000),
            accept_invalid_certs: true,
        }
    }
}

impl ScanConfig {
    /// Clamps values the engine cannot operate with: at least one host slot
    /// and timeout floors matching the defaults' order of magnitude.
    pub(crate) fn normalized(mut self) -> Self {
        self.max_concurrent_hosts = self.max_concurrent_hosts.max(1);
        self.port_probe_timeout = self.port_probe_timeout.max(Duration::from_millis(50));
        self.rtsp_connect_timeout = self.rtsp_connect_timeout.max(Duration::from_millis(200));
        self
    }
}
