//! API client and token command handlers.

use serde::Serialize;
use tabled::Tabled;

use pepfob_core::{ClientRecord, ClientScope};

use crate::cli::{ClientsArgs, ClientsCommand, GlobalOpts, ScopeArg, TokenArgs, TokenCommand};
use crate::error::CliError;
use crate::output;

use super::{RouterHandle, util};

// ── Views ───────────────────────────────────────────────────────────

/// Client record without its secret.
#[derive(Serialize)]
struct ClientView {
    id: String,
    name: String,
    scope: ClientScope,
    has_token: bool,
    token_expiry_secs: u64,
}

impl From<&ClientRecord> for ClientView {
    fn from(c: &ClientRecord) -> Self {
        Self {
            id: c.id.clone(),
            name: c.name.clone(),
            scope: c.scope,
            has_token: c.token.is_some(),
            token_expiry_secs: c.token_expiry_secs,
        }
    }
}

#[derive(Tabled)]
struct ClientRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Scope")]
    scope: String,
    #[tabled(rename = "Token")]
    token: String,
}

impl From<&ClientView> for ClientRow {
    fn from(c: &ClientView) -> Self {
        Self {
            id: c.id.clone(),
            name: c.name.clone(),
            scope: c.scope.to_string(),
            token: if c.has_token {
                format!("{}s", c.token_expiry_secs)
            } else {
                "-".into()
            },
        }
    }
}

fn detail(c: &ClientView) -> String {
    [
        format!("ID:     {}", c.id),
        format!("Name:   {}", c.name),
        format!("Scope:  {}", c.scope),
        format!("Token:  {}", if c.has_token { "granted" } else { "none" }),
    ]
    .join("\n")
}

impl From<ScopeArg> for ClientScope {
    fn from(arg: ScopeArg) -> Self {
        match arg {
            ScopeArg::ReadOnly => ClientScope::ReadOnly,
            ScopeArg::ReadWrite => ClientScope::ReadWrite,
        }
    }
}

// ── Handlers ────────────────────────────────────────────────────────

pub async fn handle(router: &RouterHandle, args: ClientsArgs, global: &GlobalOpts) -> Result<(), CliError> {
    util::ensure_login(router).await?;
    let session = &router.session;

    match args.command {
        ClientsCommand::List => {
            let clients = util::retry_once(|| session.list_clients()).await?;
            let views: Vec<ClientView> = clients.iter().map(ClientView::from).collect();
            let out = output::render_list(&global.output, &views, |c| ClientRow::from(c), |c| c.id.clone());
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ClientsCommand::Create { name, scope } => {
            if name.is_empty() || name.len() > pepfob_config::NAME_MAX_LEN {
                return Err(CliError::Validation {
                    field: "name".into(),
                    reason: format!("must be 1-{} bytes", pepfob_config::NAME_MAX_LEN),
                });
            }
            let scope = ClientScope::from(scope);
            let record = util::retry_once(|| session.create_client(&name, scope)).await?;
            let out = output::render_single(&global.output, &ClientView::from(&record), detail, |c| {
                c.id.clone()
            });
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ClientsCommand::Delete { id } => {
            let clients = util::retry_once(|| session.list_clients()).await?;
            if !clients.iter().any(|c| c.id == id) {
                return Err(CliError::NotFound {
                    resource_type: "API client".into(),
                    identifier: id,
                    list_command: "clients list".into(),
                });
            }
            util::retry_once(|| session.delete_client(&id)).await?;
            if !global.quiet {
                eprintln!("Deleted client {id}");
            }
            Ok(())
        }

        ClientsCommand::Purge => {
            if !util::confirm("Delete every API client on the router?", "clients purge", global.yes)? {
                return Ok(());
            }
            util::retry_once(|| session.delete_all_clients()).await?;
            if !global.quiet {
                eprintln!("All API clients deleted");
            }
            Ok(())
        }
    }
}

pub async fn handle_token(router: &RouterHandle, args: TokenArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        TokenCommand::Refresh => {
            util::ensure_login(router).await?;
            util::retry_once(|| router.session.refresh_token()).await?;
            if !global.quiet {
                eprintln!("Access token refreshed");
            }
            Ok(())
        }
    }
}
