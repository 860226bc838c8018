//! `pepfob session`: idempotent bootstrap.

use serde::Serialize;

use crate::cli::{GlobalOpts, SessionArgs};
use crate::error::CliError;
use crate::output;

use super::{RouterHandle, util};

#[derive(Serialize)]
struct SessionSummary {
    router: String,
    logged_in: bool,
    token: bool,
    clients: usize,
    active_client: Option<String>,
}

fn detail(s: &SessionSummary) -> String {
    [
        format!("Router:    {}", s.router),
        format!("Logged in: {}", s.logged_in),
        format!("Token:     {}", if s.token { "cached" } else { "none" }),
        format!("Clients:   {}", s.clients),
        format!("Active:    {}", s.active_client.as_deref().unwrap_or("-")),
    ]
    .join("\n")
}

pub async fn handle(router: &RouterHandle, args: SessionArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let force = args.force_recreate || router.config.force_recreate_clients;
    util::connect(router, force).await?;

    let clients = router.session.clients().await;
    let summary = SessionSummary {
        router: router.config.url.to_string(),
        logged_in: router.session.has_cookie().await,
        token: router.session.has_token().await,
        clients: clients.len(),
        active_client: clients
            .iter()
            .find(|c| c.token.is_some())
            .map(|c| format!("{} ({})", c.name, c.id)),
    };

    let out = output::render_single(&global.output, &summary, detail, |s| s.router.clone());
    output::print_output(&out, global.quiet);
    Ok(())
}
