// ── Task orchestrator ──
//
// A fixed roster of long-running tasks sharing one `Runtime`:
//
// - the UI actor, sole owner of the menu engine, fed by an action channel
// - the input worker, turning raw button edges into presses
// - the Wi-Fi and router watchdogs plus the router re-probe worker
// - at most one periodic data task, replaced whenever a page starts one
// - one countdown runner per live countdown
//
// Network calls never run on the UI actor. Composed frames are published
// on a `watch` channel for whatever draws them.

pub mod action;
mod pages;
mod ui;
mod workers;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::board::Board;
use crate::config::DeviceConfig;
use crate::countdown::CountdownKind;
use crate::input::RawEdge;
use crate::menu::Frame;
use crate::session::SessionManager;
use crate::state::SharedState;
use crate::store::SettingsStore;
use crate::wan::WanStatusModel;

pub use action::{Action, DataKind, Fetch, PageId};

const EDGE_QUEUE: usize = 32;

/// Everything a task may reach. Shared behind one `Arc`.
pub(crate) struct Runtime<B> {
    pub(crate) board: B,
    pub(crate) session: Arc<SessionManager>,
    pub(crate) wans: Arc<WanStatusModel>,
    pub(crate) settings: Arc<dyn SettingsStore>,
    pub(crate) state: Arc<SharedState>,
    pub(crate) config: DeviceConfig,
    pub(crate) actions: mpsc::UnboundedSender<Action>,
    pub(crate) cancel: CancellationToken,
}

impl<B> Runtime<B> {
    pub(crate) fn send(&self, action: Action) {
        if self.actions.send(action).is_err() {
            debug!("UI actor gone; action dropped");
        }
    }

    /// How long a countdown of `kind` runs before expiring.
    pub(crate) fn budget(&self, kind: CountdownKind) -> Duration {
        match kind {
            CountdownKind::WifiConnect => self.config.wifi.connect_timeout,
            CountdownKind::RouterConnect => self.config.timing.router_countdown,
            CountdownKind::Shutdown | CountdownKind::Reboot | CountdownKind::FactoryReset => {
                self.config.timing.power_countdown
            }
        }
    }
}

/// Entry point that wires the roster together.
pub struct TaskOrchestrator;

impl TaskOrchestrator {
    /// Spawn every task on the current tokio runtime.
    pub fn spawn<B: Board>(
        config: DeviceConfig,
        board: B,
        session: Arc<SessionManager>,
        wans: Arc<WanStatusModel>,
        settings: Arc<dyn SettingsStore>,
    ) -> OrchestratorHandle {
        let (action_tx, action_rx) = mpsc::unbounded_channel();
        let (edge_tx, edge_rx) = mpsc::channel(EDGE_QUEUE);
        let (frame_tx, frame_rx) = watch::channel(Frame::default());
        let state = Arc::new(SharedState::new());
        let cancel = CancellationToken::new();

        let rt = Arc::new(Runtime {
            board,
            session,
            wans,
            settings,
            state: Arc::clone(&state),
            config,
            actions: action_tx.clone(),
            cancel: cancel.clone(),
        });

        let actor = ui::UiActor::new(Arc::clone(&rt), action_rx, frame_tx);
        let tasks = vec![
            tokio::spawn(actor.run()),
            tokio::spawn(workers::input_worker(Arc::clone(&rt), edge_rx)),
            tokio::spawn(workers::wifi_watchdog(Arc::clone(&rt))),
            tokio::spawn(workers::router_watchdog(Arc::clone(&rt))),
            tokio::spawn(workers::router_probe_worker(rt)),
        ];
        info!(tasks = tasks.len(), "orchestrator started");

        OrchestratorHandle {
            frames: frame_rx,
            edges: edge_tx,
            actions: action_tx,
            state,
            cancel,
            tasks,
        }
    }
}

/// Owner-side handle on a running orchestrator.
pub struct OrchestratorHandle {
    frames: watch::Receiver<Frame>,
    edges: mpsc::Sender<RawEdge>,
    actions: mpsc::UnboundedSender<Action>,
    state: Arc<SharedState>,
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl OrchestratorHandle {
    /// Receiver of composed frames; the latest one is always current.
    pub fn frames(&self) -> watch::Receiver<Frame> {
        self.frames.clone()
    }

    /// Sender for raw button edges.
    pub fn edges(&self) -> mpsc::Sender<RawEdge> {
        self.edges.clone()
    }

    /// Inject an action as if a page hook had sent it.
    pub fn dispatch(&self, action: Action) {
        let _ = self.actions.send(action);
    }

    pub fn state(&self) -> &Arc<SharedState> {
        &self.state
    }

    /// Resolves once every task has been asked to stop (a `Quit` action
    /// or `shutdown`).
    pub async fn stopped(&self) {
        self.cancel.cancelled().await;
    }

    /// Cancel every task and wait for them to finish.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        for task in self.tasks {
            let _ = task.await;
        }
        info!("orchestrator stopped");
    }
}
