//! Command dispatch: bridges CLI args -> session manager -> output formatting.

pub mod clients;
pub mod config_cmd;
pub mod session;
pub mod system;
pub mod util;
pub mod wan;

use std::sync::Arc;

use pepfob_core::{RouterConfig, SessionManager, WanStatusModel};

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Everything a router-bound command needs.
pub struct RouterHandle {
    pub session: Arc<SessionManager>,
    pub wans: WanStatusModel,
    pub config: RouterConfig,
}

/// Dispatch a router-bound command to the appropriate handler.
pub async fn dispatch(cmd: Command, router: &RouterHandle, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Session(args) => session::handle(router, args, global).await,
        Command::Clients(args) => clients::handle(router, args, global).await,
        Command::Token(args) => clients::handle_token(router, args, global).await,
        Command::Wan(args) => wan::handle(router, args, global).await,
        Command::Traffic(args) => wan::handle_traffic(router, args, global).await,
        Command::Info => system::info(router, global).await,
        Command::Location => system::location(router, global).await,
        Command::Config(_) | Command::Completions(_) => Err(CliError::Internal(
            "config and completions are handled before dispatch".into(),
        )),
    }
}
