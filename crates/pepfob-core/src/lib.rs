//! Device logic between `pepfob-api` and the front ends (CLI / simulator).
//!
//! - **[`SessionManager`]**: the single chokepoint for authenticated router
//!   calls. Owns the admin cookie, the API client list and the access
//!   token behind one async mutex, persists them through a
//!   [`CredentialStore`], and recovers in-band from expired sessions and
//!   tokens (see [`CoreError::retry_ready`]).
//!
//! - **[`WanStatusModel`]**: fetches WAN connection status and traffic
//!   counters and publishes priority-ordered [`WanLink`]s on a `watch`
//!   channel.
//!
//! - **[`MenuEngine`]**: pages, highlight cursor and lifecycle hooks,
//!   rendered into a display-agnostic [`Frame`].
//!
//! - **[`TaskOrchestrator`]**: the concurrent roster (UI actor, input,
//!   watchdogs, data polling, countdowns) driving a [`Board`].

pub mod board;
pub mod config;
pub mod convert;
pub mod countdown;
pub mod error;
pub mod input;
pub mod menu;
pub mod model;
pub mod orchestrator;
pub mod session;
pub mod signal;
pub mod state;
pub mod store;
pub mod wan;

// ── Primary re-exports ──────────────────────────────────────────────
pub use board::{Board, ScanResult, WifiMode, WifiStatus};
pub use config::{DeviceConfig, PurgePolicy, RouterConfig, Timing, TlsVerification, WifiConfig, WifiNetwork};
pub use countdown::{CountdownKind, CountdownOutcome, Countdowns, StopReason};
pub use error::CoreError;
pub use input::{Button, ButtonEvent, ButtonInputStateMachine, Press, RawEdge};
pub use menu::{AuxText, Color, Frame, FrameItem, FrameLine, MenuEngine, MenuItem, MenuPage};
pub use model::{
    CellularLink, ClientRecord, LedColor, RouterInfo, RouterLocation, SimSlot, WanKind, WanLink,
    WifiLink,
};
pub use orchestrator::{Action, OrchestratorHandle, PageId, TaskOrchestrator};
pub use session::SessionManager;
pub use signal::Signal;
pub use state::SharedState;
pub use store::{CredentialJar, CredentialStore, FileStore, MemoryStore, SettingsStore, SsidSlot};
pub use wan::WanStatusModel;

pub use pepfob_api::ClientScope;
