//! CLI configuration: a thin wrapper around `pepfob_config`.
//!
//! Loads the settings file and applies `GlobalOpts` flag overrides
//! (--router, --username, --insecure, --timeout) on top.

use std::sync::Arc;
use std::time::Duration;

use pepfob_core::{DeviceConfig, FileStore, RouterConfig, SessionManager, TlsVerification};

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub use pepfob_config::{Settings, data_dir, settings_path};

/// Build the runtime config from the settings file plus CLI overrides.
pub fn resolve_device_config(global: &GlobalOpts) -> Result<DeviceConfig, CliError> {
    let settings = pepfob_config::load_settings()?;
    let mut config = settings.to_device_config()?;
    apply_overrides(&mut config.router, global)?;
    Ok(config)
}

/// Flag values take priority over the settings file.
pub fn apply_overrides(router: &mut RouterConfig, global: &GlobalOpts) -> Result<(), CliError> {
    if let Some(ref raw) = global.router {
        router.url = raw.parse().map_err(|_| CliError::Validation {
            field: "router".into(),
            reason: format!("invalid URL: {raw}"),
        })?;
    }

    if let Some(ref username) = global.username {
        if username.is_empty() || username.len() > pepfob_config::NAME_MAX_LEN {
            return Err(CliError::Validation {
                field: "username".into(),
                reason: format!("must be 1-{} bytes", pepfob_config::NAME_MAX_LEN),
            });
        }
        router.username.clone_from(username);
    }

    if global.insecure {
        router.tls = TlsVerification::DangerAcceptInvalid;
    }

    if let Some(secs) = global.timeout {
        router.timeout = Duration::from_secs(secs);
    }
    Ok(())
}

/// Session manager whose credential jar persists under the data dir, so
/// consecutive invocations reuse the cookie and token.
pub fn open_session(router: &RouterConfig) -> Result<Arc<SessionManager>, CliError> {
    let store = Arc::new(FileStore::new(data_dir()));
    Ok(Arc::new(SessionManager::new(router, store)?))
}
