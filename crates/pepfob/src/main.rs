mod cli;
mod commands;
mod config;
mod error;
mod output;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use pepfob_core::WanStatusModel;

use crate::cli::{Cli, Command};
use crate::commands::RouterHandle;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.global.verbose);

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        // Config commands never talk to the router
        Command::Config(args) => commands::config_cmd::handle(args, &cli.global),

        Command::Completions(args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "pepfob", &mut std::io::stdout());
            Ok(())
        }

        cmd => {
            let config = config::resolve_device_config(&cli.global)?;
            let session = config::open_session(&config.router)?;
            let router = RouterHandle {
                wans: WanStatusModel::new(std::sync::Arc::clone(&session)),
                session,
                config: config.router,
            };

            tracing::debug!(command = ?cmd, url = %router.config.url, "dispatching command");
            let url = router.config.url.to_string();
            commands::dispatch(cmd, &router, &cli.global)
                .await
                .map_err(|e| e.at_router(&url))
        }
    }
}
