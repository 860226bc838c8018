//! Clap derive structures for the `pepfob` CLI.
//!
//! Kept free of crate-internal imports so `build.rs` can include it to
//! render man pages.

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// pepfob -- talk to a Peplink router the way the fob does
#[derive(Debug, Parser)]
#[command(
    name = "pepfob",
    version,
    about = "Manage Peplink router sessions, API clients and WAN status",
    long_about = "Drives the same session manager as the pepfob device against a real\n\
        router: admin login, API client provisioning, access tokens, and\n\
        WAN / SIM / traffic / system queries. Credentials are cached between\n\
        invocations.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Router base URL (overrides the settings file)
    #[arg(long, short = 'r', env = "PEPFOB_URL", global = true)]
    pub router: Option<String>,

    /// Router admin username (overrides the settings file)
    #[arg(long, short = 'u', env = "PEPFOB_USERNAME", global = true)]
    pub username: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "PEPFOB_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', env = "PEPFOB_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds (overrides the settings file)
    #[arg(long, env = "PEPFOB_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output Enum ──────────────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Log in and make sure an API client with a valid token exists
    Session(SessionArgs),

    /// Manage the router's API clients
    #[command(alias = "cl")]
    Clients(ClientsArgs),

    /// Manage the cached access token
    Token(TokenArgs),

    /// Show WAN connection status
    Wan(WanArgs),

    /// Show per-WAN upload and download rates
    Traffic(TrafficArgs),

    /// Show router identity, firmware and uptime
    Info,

    /// Show the router's GPS location
    #[command(alias = "loc")]
    Location,

    /// Manage the settings file
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Session ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct SessionArgs {
    /// Delete every API client and provision a fresh one
    #[arg(long)]
    pub force_recreate: bool,
}

// ── Clients ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ClientsArgs {
    #[command(subcommand)]
    pub command: ClientsCommand,
}

#[derive(Debug, Subcommand)]
pub enum ClientsCommand {
    /// List API clients
    #[command(alias = "ls")]
    List,

    /// Create an API client and grant it a token
    Create {
        /// Client name (at most 32 bytes)
        name: String,

        /// Access scope
        #[arg(long, default_value = "read-write")]
        scope: ScopeArg,
    },

    /// Delete an API client by id
    #[command(alias = "rm")]
    Delete {
        /// Router-assigned client id
        id: String,
    },

    /// Delete every API client on the router
    Purge,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ScopeArg {
    ReadOnly,
    ReadWrite,
}

// ── Token ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct TokenArgs {
    #[command(subcommand)]
    pub command: TokenCommand,
}

#[derive(Debug, Subcommand)]
pub enum TokenCommand {
    /// Replace all clients with a fresh one and cache its token
    Refresh,
}

// ── WAN & traffic ────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct WanArgs {
    #[command(subcommand)]
    pub command: WanCommand,
}

#[derive(Debug, Subcommand)]
pub enum WanCommand {
    /// List WAN links in priority order
    #[command(alias = "ls")]
    List {
        /// Only this WAN id
        #[arg(long)]
        id: Option<u8>,
    },

    /// Show SIM slots of every cellular WAN
    Sims,
}

#[derive(Debug, Args)]
pub struct TrafficArgs {
    /// Only this WAN id
    #[arg(long)]
    pub id: Option<u8>,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create the settings file with guided setup
    Init,

    /// Display the resolved settings (secrets masked)
    Show,

    /// Print the settings file location
    Path,

    /// Store the router admin password in the system keyring
    SetPassword,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
