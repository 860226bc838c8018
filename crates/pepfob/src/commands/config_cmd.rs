//! Config subcommand handlers.

use dialoguer::{Confirm, Input, Password, Select};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::{self, Settings};
use crate::error::CliError;
use crate::output;

const REDACTED: &str = "****";

// ── Helpers ─────────────────────────────────────────────────────────

/// Map a dialoguer / interactive I/O failure into CliError.
fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() { None } else { Some(value) }
}

/// Copy of `settings` that is safe to print.
fn redacted(settings: &Settings) -> Settings {
    let mut s = settings.clone();
    for pw in [
        &mut s.router.password,
        &mut s.wifi.primary_password,
        &mut s.wifi.secondary_password,
    ] {
        if pw.is_some() {
            *pw = Some(REDACTED.into());
        }
    }
    s.wifi.ap_password = REDACTED.into();
    s
}

fn prompt_router_password() -> Result<String, CliError> {
    let password = Password::new()
        .with_prompt("Router admin password")
        .interact()
        .map_err(prompt_err)?;
    if password.is_empty() || password.len() > pepfob_config::PASSWORD_MAX_LEN {
        return Err(CliError::Validation {
            field: "password".into(),
            reason: format!("must be 1-{} bytes", pepfob_config::PASSWORD_MAX_LEN),
        });
    }
    Ok(password)
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        // ── Init: interactive wizard ────────────────────────────────
        ConfigCommand::Init => {
            let path = config::settings_path();
            if path.exists()
                && !global.yes
                && !Confirm::new()
                    .with_prompt(format!("{} exists. Overwrite?", path.display()))
                    .default(false)
                    .interact()
                    .map_err(prompt_err)?
            {
                return Ok(());
            }

            eprintln!("pepfob configuration wizard");
            eprintln!("   Settings path: {}\n", path.display());

            let mut settings = Settings::default();

            settings.router.ip = Input::new()
                .with_prompt("Router IP")
                .default(settings.router.ip.clone())
                .interact_text()
                .map_err(prompt_err)?;

            settings.router.https = Confirm::new()
                .with_prompt("Use HTTPS?")
                .default(false)
                .interact()
                .map_err(prompt_err)?;

            settings.router.username = Input::new()
                .with_prompt("Admin username")
                .default(settings.router.username.clone())
                .interact_text()
                .map_err(prompt_err)?;

            let password = prompt_router_password()?;
            let store_choices = &[
                "Store password in system keyring (recommended)",
                "Save to settings file (plaintext)",
            ];
            let store_selection = Select::new()
                .with_prompt("Where to store the password?")
                .items(store_choices)
                .default(0)
                .interact()
                .map_err(prompt_err)?;
            if store_selection == 0 {
                pepfob_config::store_router_password(&password)?;
                eprintln!("   Password stored in system keyring");
            } else {
                settings.router.password = Some(password);
            }

            let ssid: String = Input::new()
                .with_prompt("Primary Wi-Fi SSID (empty to skip)")
                .allow_empty(true)
                .interact_text()
                .map_err(prompt_err)?;
            if let Some(ssid) = non_empty(ssid) {
                let wifi_password = Password::new()
                    .with_prompt("Primary Wi-Fi password")
                    .allow_empty_password(true)
                    .interact()
                    .map_err(prompt_err)?;
                settings.wifi.primary_ssid = Some(ssid);
                settings.wifi.primary_password = non_empty(wifi_password);
            }

            pepfob_config::save_settings(&settings)?;

            eprintln!("\nSettings written to {}", path.display());
            eprintln!("\n  Test it: pepfob session");
            Ok(())
        }

        // ── Show ────────────────────────────────────────────────────
        ConfigCommand::Show => {
            let settings = redacted(&pepfob_config::load_settings()?);
            let out = output::render_single(
                &global.output,
                &settings,
                |s| toml::to_string_pretty(s).unwrap_or_else(|e| format!("<unrenderable: {e}>")),
                |_| "settings".into(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Path => {
            println!("{}", config::settings_path().display());
            Ok(())
        }

        ConfigCommand::SetPassword => {
            let password = prompt_router_password()?;
            pepfob_config::store_router_password(&password)?;
            if !global.quiet {
                eprintln!("Router password stored in system keyring");
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redaction_masks_only_present_secrets() {
        let mut settings = Settings::default();
        settings.router.password = Some("hunter2".into());
        settings.wifi.primary_ssid = Some("cafe".into());

        let shown = redacted(&settings);
        assert_eq!(shown.router.password.as_deref(), Some(REDACTED));
        assert_eq!(shown.wifi.primary_password, None);
        assert_eq!(shown.wifi.ap_password, REDACTED);
        assert_eq!(shown.wifi.primary_ssid.as_deref(), Some("cafe"));
    }
}
