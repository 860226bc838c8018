//! Shared helpers for command handlers.

use std::future::Future;
use std::io::IsTerminal;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::debug;

use pepfob_core::CoreError;

use super::RouterHandle;
use crate::error::CliError;

/// Run `op`, and run it once more when the failure already recovered
/// the session in-band (re-login or token refresh succeeded).
pub async fn retry_once<T, F, Fut>(mut op: F) -> Result<T, CoreError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, CoreError>>,
{
    match op().await {
        Err(e) if e.retry_ready() => {
            debug!(error = %e, "session recovered, retrying");
            op().await
        }
        other => other,
    }
}

/// Log in unless a cached admin cookie exists. Enough for client CRUD.
pub async fn ensure_login(router: &RouterHandle) -> Result<(), CliError> {
    if !router.session.has_cookie().await {
        router
            .session
            .login(&router.config.username, &router.config.password)
            .await?;
    }
    Ok(())
}

/// Full bootstrap (cookie, client and token) behind a spinner.
pub async fn connect(router: &RouterHandle, force_recreate: bool) -> Result<(), CliError> {
    let spinner = spinner("Connecting to router");
    let result = router.session.ensure_session(force_recreate).await;
    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }
    result?;
    Ok(())
}

fn spinner(message: &'static str) -> Option<ProgressBar> {
    if !std::io::stderr().is_terminal() {
        return None;
    }
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(100));
    Some(pb)
}

/// Prompt for confirmation, auto-approving if `--yes` was passed.
pub fn confirm(message: &str, action: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    if !std::io::stdin().is_terminal() {
        return Err(CliError::NonInteractiveRequiresYes {
            action: action.into(),
        });
    }
    let confirmed = dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(|e| CliError::Io(std::io::Error::other(e)))?;
    Ok(confirmed)
}

/// `1d 02:03:04`, or `02:03:04` under a day.
pub fn format_uptime(secs: u64) -> String {
    let (days, rest) = (secs / 86_400, secs % 86_400);
    let clock = format!("{:02}:{:02}:{:02}", rest / 3600, rest % 3600 / 60, rest % 60);
    if days > 0 {
        format!("{days}d {clock}")
    } else {
        clock
    }
}
