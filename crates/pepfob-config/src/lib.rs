//! User settings for the pepfob CLI and simulator.
//!
//! One TOML file (Wi-Fi networks, router address and admin credentials,
//! API client defaults, device tuning), layered with environment
//! overrides, validated against the device limits, and translated to
//! `pepfob_core::DeviceConfig`. [`FileSettingsStore`] lets the device
//! runtime remember scanned networks and factory-reset the file.

use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use pepfob_core::{
    ClientScope, CoreError, DeviceConfig, RouterConfig, SettingsStore, SsidSlot, Timing,
    TlsVerification, WifiConfig, WifiNetwork,
};

/// Longest SSID, device name or client name.
pub const NAME_MAX_LEN: usize = 32;
/// Longest Wi-Fi or admin password.
pub const PASSWORD_MAX_LEN: usize = 64;
/// Longest dotted-quad address.
pub const IPV4_MAX_LEN: usize = 15;

pub const HTTP_PORT_DEFAULT: u16 = 88;
pub const HTTPS_PORT_DEFAULT: u16 = 8443;

/// Environment variable holding the router admin password.
pub const PASSWORD_ENV: &str = "PEPFOB_ROUTER_PASSWORD";
const KEYRING_SERVICE: &str = "pepfob";
const KEYRING_USER: &str = "router-password";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no router admin password configured (set PEPFOB_ROUTER_PASSWORD, the keyring, or router.password)")]
    NoCredentials,

    #[error("failed to serialize settings: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("settings loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

impl From<ConfigError> for CoreError {
    fn from(err: ConfigError) -> Self {
        CoreError::Config {
            message: err.to_string(),
        }
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        field: field.into(),
        reason: reason.into(),
    }
}

// ── TOML settings structs ───────────────────────────────────────────

/// Top-level settings record.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Settings {
    /// Shown on the home page and used as the default AP name.
    #[serde(default = "default_device_name")]
    pub device_name: String,

    #[serde(default)]
    pub wifi: WifiSettings,

    #[serde(default)]
    pub router: RouterSettings,

    #[serde(default)]
    pub device: DeviceSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            device_name: default_device_name(),
            wifi: WifiSettings::default(),
            router: RouterSettings::default(),
            device: DeviceSettings::default(),
        }
    }
}

fn default_device_name() -> String {
    "pepfob".into()
}

/// Station networks (primary, then secondary) and the soft-AP.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct WifiSettings {
    pub primary_ssid: Option<String>,
    pub primary_password: Option<String>,
    pub secondary_ssid: Option<String>,
    pub secondary_password: Option<String>,

    #[serde(default = "default_ap_ssid")]
    pub ap_ssid: String,
    #[serde(default = "default_ap_password")]
    pub ap_password: String,

    /// Seconds to wait for a station join before giving up.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

impl Default for WifiSettings {
    fn default() -> Self {
        Self {
            primary_ssid: None,
            primary_password: None,
            secondary_ssid: None,
            secondary_password: None,
            ap_ssid: default_ap_ssid(),
            ap_password: default_ap_password(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

fn default_ap_ssid() -> String {
    "pepfob".into()
}
fn default_ap_password() -> String {
    "pepfob123".into()
}
fn default_connect_timeout() -> u64 {
    300
}

/// Router address, admin login and API client defaults.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RouterSettings {
    /// LAN address of the router (IPv4).
    #[serde(default = "default_router_ip")]
    pub ip: String,

    /// Explicit port. Unset means 88, or 8443 with HTTPS.
    pub port: Option<u16>,

    #[serde(default)]
    pub https: bool,

    /// Accept self-signed certificates.
    #[serde(default = "default_true")]
    pub insecure: bool,

    /// Custom CA certificate, used when `insecure` is off.
    pub ca_cert: Option<PathBuf>,

    #[serde(default = "default_username")]
    pub username: String,

    /// Admin password (plaintext; prefer the keyring or the env var).
    pub password: Option<String>,

    #[serde(default = "default_client_name")]
    pub client_name: String,

    #[serde(default)]
    pub client_scope: ClientScope,

    /// Delete every API client at bootstrap instead of reusing one.
    #[serde(default)]
    pub force_recreate_clients: bool,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for RouterSettings {
    fn default() -> Self {
        Self {
            ip: default_router_ip(),
            port: None,
            https: false,
            insecure: true,
            ca_cert: None,
            username: default_username(),
            password: None,
            client_name: default_client_name(),
            client_scope: ClientScope::default(),
            force_recreate_clients: false,
            timeout_secs: default_timeout(),
        }
    }
}

fn default_router_ip() -> String {
    "192.168.50.1".into()
}
fn default_true() -> bool {
    true
}
fn default_username() -> String {
    "admin".into()
}
fn default_client_name() -> String {
    "Client1".into()
}
fn default_timeout() -> u64 {
    10
}

impl RouterSettings {
    pub fn effective_port(&self) -> u16 {
        self.port.unwrap_or(if self.https {
            HTTPS_PORT_DEFAULT
        } else {
            HTTP_PORT_DEFAULT
        })
    }

    /// Base URL of the router's web admin.
    pub fn url(&self) -> Result<url::Url, ConfigError> {
        let scheme = if self.https { "https" } else { "http" };
        let raw = format!("{scheme}://{}:{}", self.ip, self.effective_port());
        raw.parse().map_err(|_| invalid("router.ip", format!("not a usable address: {raw}")))
    }

    fn tls(&self) -> TlsVerification {
        if self.insecure {
            TlsVerification::DangerAcceptInvalid
        } else if let Some(ref ca) = self.ca_cert {
            TlsVerification::CustomCa(ca.clone())
        } else {
            TlsVerification::SystemDefaults
        }
    }
}

/// Device tuning.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct DeviceSettings {
    #[serde(default = "default_long_press")]
    pub long_press_ms: u64,
    #[serde(default = "default_shutdown_press")]
    pub shutdown_press_ms: u64,
    #[serde(default = "default_power_countdown")]
    pub power_countdown_secs: u64,
    #[serde(default = "default_router_countdown")]
    pub router_countdown_secs: u64,
    #[serde(default = "default_ping_targets")]
    pub ping_targets: Vec<String>,
    #[serde(default = "default_max_items")]
    pub max_visible_items: usize,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            long_press_ms: default_long_press(),
            shutdown_press_ms: default_shutdown_press(),
            power_countdown_secs: default_power_countdown(),
            router_countdown_secs: default_router_countdown(),
            ping_targets: default_ping_targets(),
            max_visible_items: default_max_items(),
        }
    }
}

fn default_long_press() -> u64 {
    300
}
fn default_shutdown_press() -> u64 {
    1000
}
fn default_power_countdown() -> u64 {
    5
}
fn default_router_countdown() -> u64 {
    60
}
fn default_ping_targets() -> Vec<String> {
    vec!["8.8.8.8".into(), "1.1.1.1".into()]
}
fn default_max_items() -> usize {
    6
}

// ── Validation ──────────────────────────────────────────────────────

fn check_name(field: &str, value: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(invalid(field, "must not be empty"));
    }
    if value.len() > NAME_MAX_LEN {
        return Err(invalid(field, format!("longer than {NAME_MAX_LEN} bytes")));
    }
    Ok(())
}

fn check_password(field: &str, value: Option<&str>) -> Result<(), ConfigError> {
    match value {
        Some(pw) if pw.len() > PASSWORD_MAX_LEN => {
            Err(invalid(field, format!("longer than {PASSWORD_MAX_LEN} bytes")))
        }
        _ => Ok(()),
    }
}

impl Settings {
    /// Enforce the device's field limits.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_name("device_name", &self.device_name)?;

        let wifi = &self.wifi;
        if let Some(ref ssid) = wifi.primary_ssid {
            check_name("wifi.primary_ssid", ssid)?;
        }
        if let Some(ref ssid) = wifi.secondary_ssid {
            check_name("wifi.secondary_ssid", ssid)?;
        }
        check_name("wifi.ap_ssid", &wifi.ap_ssid)?;
        check_password("wifi.primary_password", wifi.primary_password.as_deref())?;
        check_password("wifi.secondary_password", wifi.secondary_password.as_deref())?;
        check_password("wifi.ap_password", Some(&wifi.ap_password))?;
        if wifi.connect_timeout_secs == 0 {
            return Err(invalid("wifi.connect_timeout_secs", "must be positive"));
        }

        let router = &self.router;
        if router.ip.len() > IPV4_MAX_LEN || router.ip.parse::<Ipv4Addr>().is_err() {
            return Err(invalid("router.ip", format!("'{}' is not an IPv4 address", router.ip)));
        }
        if router.port == Some(0) {
            return Err(invalid("router.port", "must not be 0"));
        }
        check_name("router.username", &router.username)?;
        check_password("router.password", router.password.as_deref())?;
        check_name("router.client_name", &router.client_name)?;

        if self.device.max_visible_items == 0 {
            return Err(invalid("device.max_visible_items", "must be positive"));
        }
        Ok(())
    }

    /// Build the runtime configuration, resolving the admin password.
    pub fn to_device_config(&self) -> Result<DeviceConfig, ConfigError> {
        self.validate()?;
        let password = resolve_router_password(&self.router)?;
        self.device_config_with(password)
    }

    /// Build the runtime configuration with an already-resolved password.
    pub fn device_config_with(&self, password: SecretString) -> Result<DeviceConfig, ConfigError> {
        let r = &self.router;
        let mut router = RouterConfig::new(r.url()?, r.username.clone(), password);
        router.client_name.clone_from(&r.client_name);
        router.client_scope = r.client_scope;
        router.tls = r.tls();
        router.timeout = Duration::from_secs(r.timeout_secs);
        router.force_recreate_clients = r.force_recreate_clients;

        let w = &self.wifi;
        let wifi = WifiConfig {
            primary: station(w.primary_ssid.as_ref(), w.primary_password.as_ref()),
            secondary: station(w.secondary_ssid.as_ref(), w.secondary_password.as_ref()),
            access_point: WifiNetwork {
                ssid: w.ap_ssid.clone(),
                password: SecretString::from(w.ap_password.clone()),
            },
            connect_timeout: Duration::from_secs(w.connect_timeout_secs),
        };

        let d = &self.device;
        let timing = Timing {
            long_press: Duration::from_millis(d.long_press_ms),
            shutdown_press: Duration::from_millis(d.shutdown_press_ms),
            power_countdown: Duration::from_secs(d.power_countdown_secs),
            router_countdown: Duration::from_secs(d.router_countdown_secs),
            ..Timing::default()
        };

        let mut config = DeviceConfig::new(router);
        config.wifi = wifi;
        config.timing = timing;
        config.ping_targets.clone_from(&d.ping_targets);
        config.device_name.clone_from(&self.device_name);
        config.max_visible_items = d.max_visible_items;
        Ok(config)
    }
}

fn station(ssid: Option<&String>, password: Option<&String>) -> Option<WifiNetwork> {
    ssid.map(|ssid| WifiNetwork {
        ssid: ssid.clone(),
        password: SecretString::from(password.cloned().unwrap_or_default()),
    })
}

// ── Paths ───────────────────────────────────────────────────────────

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "pepfob", "pepfob")
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("pepfob");
    p
}

/// Resolve the settings file path via XDG / platform conventions.
pub fn settings_path() -> PathBuf {
    project_dirs().map_or_else(
        || dirs_fallback().join("settings.toml"),
        |dirs| dirs.config_dir().join("settings.toml"),
    )
}

/// Directory for persisted router credentials (the cookie jar).
pub fn data_dir() -> PathBuf {
    project_dirs().map_or_else(|| dirs_fallback().join("data"), |dirs| dirs.data_dir().to_path_buf())
}

/// Directory for log files written by the simulator.
pub fn log_dir() -> PathBuf {
    project_dirs().map_or_else(
        || dirs_fallback().join("logs"),
        |dirs| dirs.data_local_dir().join("logs"),
    )
}

// ── Loading & saving ────────────────────────────────────────────────

/// Load settings from `path`, layered over defaults and under
/// `PEPFOB_*` environment overrides (`PEPFOB_ROUTER__IP`, ...).
pub fn load_settings_from(path: &Path) -> Result<Settings, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Settings::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("PEPFOB_").ignore(&["ROUTER_PASSWORD"]).split("__"));

    let settings: Settings = figment.extract()?;
    settings.validate()?;
    Ok(settings)
}

/// Load settings from the canonical path.
pub fn load_settings() -> Result<Settings, ConfigError> {
    load_settings_from(&settings_path())
}

/// Serialize settings to TOML and write them to `path`.
pub fn save_settings_to(path: &Path, settings: &Settings) -> Result<(), ConfigError> {
    settings.validate()?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(settings)?;
    std::fs::write(path, toml_str)?;
    debug!(path = %path.display(), "settings saved");
    Ok(())
}

pub fn save_settings(settings: &Settings) -> Result<(), ConfigError> {
    save_settings_to(&settings_path(), settings)
}

/// Factory reset: overwrite the file with defaults.
pub fn reset_settings_at(path: &Path) -> Result<Settings, ConfigError> {
    let defaults = Settings::default();
    save_settings_to(path, &defaults)?;
    info!(path = %path.display(), "settings reset to defaults");
    Ok(defaults)
}

// ── Credential resolution ───────────────────────────────────────────

/// Resolve the router admin password: env var, keyring, then plaintext.
pub fn resolve_router_password(router: &RouterSettings) -> Result<SecretString, ConfigError> {
    // 1. Env var
    if let Ok(pw) = std::env::var(PASSWORD_ENV) {
        return Ok(SecretString::from(pw));
    }

    // 2. Keyring
    if let Ok(entry) = keyring::Entry::new(KEYRING_SERVICE, KEYRING_USER) {
        if let Ok(pw) = entry.get_password() {
            return Ok(SecretString::from(pw));
        }
    }

    // 3. Plaintext in settings
    if let Some(ref pw) = router.password {
        return Ok(SecretString::from(pw.clone()));
    }

    Err(ConfigError::NoCredentials)
}

/// Store the router admin password in the system keyring.
pub fn store_router_password(password: &str) -> Result<(), ConfigError> {
    if password.len() > PASSWORD_MAX_LEN {
        return Err(invalid("router.password", format!("longer than {PASSWORD_MAX_LEN} bytes")));
    }
    let entry = keyring::Entry::new(KEYRING_SERVICE, KEYRING_USER)?;
    entry.set_password(password)?;
    Ok(())
}

// ── Device-facing settings store ────────────────────────────────────

/// Settings file as seen by the device runtime.
#[derive(Debug, Clone)]
pub struct FileSettingsStore {
    path: PathBuf,
}

impl FileSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsStore for FileSettingsStore {
    fn remember_ssid(&self, slot: SsidSlot, ssid: &str) -> Result<(), CoreError> {
        check_name("ssid", ssid)?;
        let mut settings = load_settings_from(&self.path)?;
        match slot {
            SsidSlot::Primary => settings.wifi.primary_ssid = Some(ssid.to_owned()),
            SsidSlot::Secondary => settings.wifi.secondary_ssid = Some(ssid.to_owned()),
        }
        save_settings_to(&self.path, &settings)?;
        Ok(())
    }

    fn factory_reset(&self) -> Result<(), CoreError> {
        reset_settings_at(&self.path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use pretty_assertions::assert_eq;
    use secrecy::ExposeSecret;

    use super::*;

    fn write(dir: &tempfile::TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = load_settings_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.router.effective_port(), 88);
    }

    #[test]
    fn https_switches_default_port() {
        let router = RouterSettings {
            https: true,
            ..RouterSettings::default()
        };
        assert_eq!(router.effective_port(), 8443);
        assert_eq!(router.url().unwrap().as_str(), "https://192.168.50.1:8443/");

        let pinned = RouterSettings {
            port: Some(443),
            https: true,
            ..RouterSettings::default()
        };
        assert_eq!(pinned.url().unwrap().port(), Some(443));
    }

    #[test]
    fn partial_file_merges_over_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            &dir,
            r#"
            [wifi]
            primary_ssid = "home"
            primary_password = "hunter22"

            [router]
            ip = "10.0.0.1"
            client_scope = "read-only"
            "#,
        );
        let settings = load_settings_from(&path).unwrap();
        assert_eq!(settings.wifi.primary_ssid.as_deref(), Some("home"));
        assert_eq!(settings.wifi.connect_timeout_secs, 300);
        assert_eq!(settings.router.ip, "10.0.0.1");
        assert_eq!(settings.router.client_scope, ClientScope::ReadOnly);
        assert_eq!(settings.router.client_name, "Client1");
    }

    #[test]
    fn rejects_out_of_range_fields() {
        let mut s = Settings::default();
        s.wifi.primary_ssid = Some("x".repeat(33));
        assert!(matches!(s.validate(), Err(ConfigError::Validation { field, .. }) if field == "wifi.primary_ssid"));

        let mut s = Settings::default();
        s.router.password = Some("p".repeat(65));
        assert!(s.validate().is_err());

        let mut s = Settings::default();
        s.router.ip = "router.local".into();
        assert!(s.validate().is_err());

        let mut s = Settings::default();
        s.router.port = Some(0);
        assert!(s.validate().is_err());
    }

    #[test]
    fn bad_scope_in_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "[router]\nclient_scope = \"admin\"\n");
        assert!(matches!(load_settings_from(&path), Err(ConfigError::Figment(_))));
    }

    #[test]
    fn device_config_carries_settings() {
        let mut s = Settings::default();
        s.wifi.primary_ssid = Some("home".into());
        s.wifi.secondary_ssid = Some("backup".into());
        s.wifi.secondary_password = Some("pw2".into());
        s.device.long_press_ms = 250;

        let config = s.device_config_with(SecretString::from("admin-pw".to_owned())).unwrap();
        assert_eq!(config.router.url.as_str(), "http://192.168.50.1:88/");
        assert_eq!(config.router.password.expose_secret(), "admin-pw");
        assert_eq!(config.router.tls, TlsVerification::DangerAcceptInvalid);
        assert_eq!(config.wifi.primary.as_ref().unwrap().password.expose_secret(), "");
        assert_eq!(config.wifi.secondary.as_ref().unwrap().ssid, "backup");
        assert_eq!(config.timing.long_press, Duration::from_millis(250));
        assert_eq!(config.wifi.connect_timeout, Duration::from_secs(300));
        assert_eq!(config.max_visible_items, 6);
    }

    #[test]
    fn store_remembers_ssid_and_resets() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.toml");
        let store = FileSettingsStore::new(&path);

        store.remember_ssid(SsidSlot::Secondary, "cafe").unwrap();
        let saved = load_settings_from(&path).unwrap();
        assert_eq!(saved.wifi.secondary_ssid.as_deref(), Some("cafe"));
        assert_eq!(saved.wifi.primary_ssid, None);

        store.factory_reset().unwrap();
        assert_eq!(load_settings_from(&path).unwrap(), Settings::default());
    }

    #[test]
    fn store_rejects_overlong_ssid() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSettingsStore::new(dir.path().join("settings.toml"));
        let err = store.remember_ssid(SsidSlot::Primary, &"s".repeat(40)).unwrap_err();
        assert!(matches!(err, CoreError::Config { .. }));
    }
}
