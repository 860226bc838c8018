// ── Runtime device configuration ──
//
// These types describe how the device talks to the router and how its
// timers are tuned. They carry credential data but never touch disk: the
// CLI/TUI builds a `DeviceConfig` (usually through pepfob-config) and
// hands it in.

use std::time::Duration;

use pepfob_api::{ClientScope, TlsMode, TransportConfig};
use secrecy::SecretString;
use url::Url;

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(std::path::PathBuf),
    /// Skip verification. Routers ship self-signed certificates.
    #[default]
    DangerAcceptInvalid,
}

impl TlsVerification {
    pub(crate) fn to_tls_mode(&self) -> TlsMode {
        match self {
            Self::SystemDefaults => TlsMode::System,
            Self::CustomCa(path) => TlsMode::CustomCa(path.clone()),
            Self::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
        }
    }
}

/// Bounds for the delete-all-clients loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PurgePolicy {
    /// Delete attempts before giving up.
    pub max_attempts: u32,
    /// Pause after the first attempt; doubles on each further attempt.
    pub initial_delay: Duration,
    /// Upper bound on the pause.
    pub max_delay: Duration,
}

impl Default for PurgePolicy {
    fn default() -> Self {
        Self {
            max_attempts: 8,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(16),
        }
    }
}

impl PurgePolicy {
    /// Pause to observe after the zero-based `attempt`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.initial_delay
            .checked_mul(factor)
            .map_or(self.max_delay, |d| d.min(self.max_delay))
    }
}

/// How to reach and authenticate with the router.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Router root URL (e.g. `http://192.168.50.1:88`).
    pub url: Url,
    pub username: String,
    pub password: SecretString,
    /// Name given to API clients this device provisions.
    pub client_name: String,
    pub client_scope: ClientScope,
    pub tls: TlsVerification,
    pub timeout: Duration,
    /// Delete and re-provision API clients on every bootstrap instead of
    /// reusing the first existing one.
    pub force_recreate_clients: bool,
    /// Attempts made by the reachability probe.
    pub probe_attempts: u32,
    pub purge: PurgePolicy,
}

impl RouterConfig {
    pub fn new(url: Url, username: impl Into<String>, password: SecretString) -> Self {
        Self {
            url,
            username: username.into(),
            password,
            client_name: "Client1".into(),
            client_scope: ClientScope::ReadWrite,
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(10),
            force_recreate_clients: false,
            probe_attempts: 3,
            purge: PurgePolicy::default(),
        }
    }

    pub fn transport(&self) -> TransportConfig {
        TransportConfig {
            tls: self.tls.to_tls_mode(),
            timeout: self.timeout,
        }
    }
}

/// One station-mode or access-point network.
#[derive(Debug, Clone)]
pub struct WifiNetwork {
    pub ssid: String,
    pub password: SecretString,
}

#[derive(Debug, Clone)]
pub struct WifiConfig {
    pub primary: Option<WifiNetwork>,
    pub secondary: Option<WifiNetwork>,
    pub access_point: WifiNetwork,
    /// Budget for the station-connect countdown.
    pub connect_timeout: Duration,
}

impl Default for WifiConfig {
    fn default() -> Self {
        Self {
            primary: None,
            secondary: None,
            access_point: WifiNetwork {
                ssid: "pepfob".into(),
                password: SecretString::from("pepfob123".to_owned()),
            },
            connect_timeout: Duration::from_secs(300),
        }
    }
}

/// Timer tuning for input, countdowns and workers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    /// Press longer than this is a long press.
    pub long_press: Duration,
    /// Power-button hold that starts the shutdown countdown.
    pub shutdown_press: Duration,
    /// Shutdown, reboot and factory-reset countdowns.
    pub power_countdown: Duration,
    /// Router-unreachable countdown.
    pub router_countdown: Duration,
    /// Period of the data-update worker.
    pub data_refresh: Duration,
    /// Period of the button poll.
    pub input_poll: Duration,
    /// Period of the Wi-Fi and router watchdogs.
    pub watchdog: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            long_press: Duration::from_millis(300),
            shutdown_press: Duration::from_millis(1000),
            power_countdown: Duration::from_secs(5),
            router_countdown: Duration::from_secs(60),
            data_refresh: Duration::from_secs(1),
            input_poll: Duration::from_millis(20),
            watchdog: Duration::from_secs(1),
        }
    }
}

/// Everything the device runtime needs, built by the CLI/TUI.
#[derive(Debug, Clone)]
pub struct DeviceConfig {
    pub router: RouterConfig,
    pub wifi: WifiConfig,
    pub timing: Timing,
    /// Hosts checked by the network diagnostics page.
    pub ping_targets: Vec<String>,
    pub device_name: String,
    /// Items drawn per menu screen.
    pub max_visible_items: usize,
}

impl DeviceConfig {
    pub fn new(router: RouterConfig) -> Self {
        Self {
            router,
            wifi: WifiConfig::default(),
            timing: Timing::default(),
            ping_targets: vec!["8.8.8.8".into(), "1.1.1.1".into()],
            device_name: "pepfob".into(),
            max_visible_items: 6,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn purge_backoff_doubles_and_caps() {
        let policy = PurgePolicy::default();
        assert_eq!(policy.delay_for(0), Duration::from_secs(1));
        assert_eq!(policy.delay_for(3), Duration::from_secs(8));
        assert_eq!(policy.delay_for(4), Duration::from_secs(16));
        assert_eq!(policy.delay_for(40), Duration::from_secs(16));
    }
}
