// ── Background workers ──
//
// Every loop here follows one shape: a tokio interval raced against the
// shared cancellation token, `biased` so cancellation always wins.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use strum::IntoEnumIterator;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::board::{Board, WifiMode, WifiStatus};
use crate::countdown::{CountdownHandle, CountdownKind, StopReason, run_countdown};
use crate::error::CoreError;
use crate::input::{Button, ButtonInputStateMachine, RawEdge};
use crate::state::{FobInfo, PingResult};

use super::Runtime;
use super::action::{Action, DataKind, Fetch, PageId};

fn ticker(period: Duration) -> tokio::time::Interval {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

/// Run `call`; when it fails with an error whose in-band recovery
/// already succeeded, run it once more.
pub(crate) async fn with_retry<T, F, Fut>(mut call: F) -> Result<T, CoreError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, CoreError>>,
{
    match call().await {
        Err(e) if e.retry_ready() => {
            debug!(error = %e, "session recovered; retrying");
            call().await
        }
        other => other,
    }
}

// ── Countdowns ───────────────────────────────────────────────────────

/// Drive a claimed countdown, reporting start, ticks and outcome to the
/// UI actor, then release the slot.
pub(crate) fn spawn_countdown<B: Board>(rt: &Arc<Runtime<B>>, handle: CountdownHandle) {
    let rt = Arc::clone(rt);
    tokio::spawn(async move {
        let kind = handle.kind;
        let budget = rt.budget(kind);
        info!(%kind, secs = budget.as_secs(), "countdown started");
        rt.send(Action::CountdownStarted(kind));

        let ticks = rt.actions.clone();
        let outcome = tokio::select! {
            biased;
            () = rt.cancel.cancelled() => {
                rt.state.countdowns.finish(&handle);
                return;
            }
            outcome = run_countdown(&handle, budget, |remaining| {
                let _ = ticks.send(Action::CountdownTick(kind, remaining));
            }) => outcome,
        };

        rt.state.countdowns.finish(&handle);
        rt.send(Action::CountdownFinished(kind, outcome));
    });
}

// ── Input ────────────────────────────────────────────────────────────

/// Classify raw edges into presses and beep once per long hold.
pub(crate) async fn input_worker<B: Board>(rt: Arc<Runtime<B>>, mut edges: mpsc::Receiver<RawEdge>) {
    let mut machine = ButtonInputStateMachine::new(rt.config.timing.long_press);
    let mut poll = ticker(rt.config.timing.input_poll);

    loop {
        tokio::select! {
            biased;
            () = rt.cancel.cancelled() => break,
            edge = edges.recv() => {
                let Some(edge) = edge else { break };
                machine.feed(edge);
                if let Some(press) = machine.take(edge.button) {
                    debug!(button = %edge.button, event = ?press.event, held_ms = press.held.as_millis(), "button");
                    rt.send(Action::Button(edge.button, press));
                }
            }
            _ = poll.tick() => {
                let now = Instant::now();
                for button in Button::iter() {
                    if machine.poll_hold(button, now) {
                        rt.board.beep();
                    }
                }
            }
        }
    }
}

// ── Wi-Fi watchdog ───────────────────────────────────────────────────

/// Mirror radio state into the snapshot and start a reconnect countdown
/// whenever station mode is up but not connected.
pub(crate) async fn wifi_watchdog<B: Board>(rt: Arc<Runtime<B>>) {
    let mut interval = ticker(rt.config.timing.watchdog);
    let mut was_connected = false;

    loop {
        tokio::select! {
            biased;
            () = rt.cancel.cancelled() => break,
            _ = interval.tick() => was_connected = wifi_check(&rt, was_connected),
        }
    }
}

fn wifi_check<B: Board>(rt: &Arc<Runtime<B>>, was_connected: bool) -> bool {
    let mode = rt.board.wifi_mode();
    let status = rt.board.wifi_status();
    let ip = rt.board.wifi_ip();

    let changed = rt.state.data.send_if_modified(|d| {
        let changed = d.wifi.mode != mode || d.wifi.status != status || d.wifi.ip != ip;
        d.wifi.mode = mode;
        d.wifi.status = status;
        d.wifi.ip = ip;
        changed
    });
    if changed {
        rt.send(Action::Render);
    }

    let connected = mode == WifiMode::Station && status == WifiStatus::Connected;
    if connected {
        if !was_connected {
            info!("Wi-Fi connected");
            // A live connect countdown reports the join itself.
            if !rt.state.countdowns.stop_kind(CountdownKind::WifiConnect, StopReason::Event)
                && rt.state.flags.booting()
            {
                rt.send(Action::GoTo(PageId::PingTargets));
                rt.state.router_release.signal(());
            }
        }
    } else if mode == WifiMode::Station && !rt.state.flags.wifi_timeout() {
        if let Some(handle) = rt.state.countdowns.try_begin(CountdownKind::WifiConnect) {
            spawn_countdown(rt, handle);
        }
    }
    connected
}

// ── Router watchdogs ─────────────────────────────────────────────────

/// Parked until Wi-Fi first connects, then keeps the router session
/// alive and starts the reachability countdown when the router drops.
pub(crate) async fn router_watchdog<B: Board>(rt: Arc<Runtime<B>>) {
    tokio::select! {
        biased;
        () = rt.cancel.cancelled() => return,
        () = rt.state.router_release.wait() => {}
    }
    info!("router watchdog released");

    let mut interval = ticker(rt.config.timing.watchdog);
    loop {
        tokio::select! {
            biased;
            () = rt.cancel.cancelled() => break,
            _ = interval.tick() => {
                if !router_check(&rt).await {
                    break;
                }
            }
        }
    }
}

/// One watchdog pass. `false` once the router was declared dead.
async fn router_check<B: Board>(rt: &Arc<Runtime<B>>) -> bool {
    if rt.state.flags.router_dead() {
        warn!("router declared unavailable; watchdog stopping");
        return false;
    }
    if rt.board.wifi_status() != WifiStatus::Connected || rt.state.countdowns.is_running() {
        return true;
    }

    if !rt.session.probe().await {
        if let Some(handle) = rt.state.countdowns.try_begin(CountdownKind::RouterConnect) {
            warn!("router unreachable");
            rt.state.flags.set_session_ready(false);
            spawn_countdown(rt, handle);
        }
        return true;
    }

    if !rt.state.flags.session_ready() {
        match rt.session.ensure_session(rt.session.force_recreate()).await {
            Ok(_) => {
                info!("router session ready");
                rt.state.flags.set_session_ready(true);
            }
            Err(e) => warn!(error = %e, "router session bootstrap failed"),
        }
    }
    true
}

/// Re-probe the router while its countdown is live and end the countdown
/// as soon as it answers.
pub(crate) async fn router_probe_worker<B: Board>(rt: Arc<Runtime<B>>) {
    let mut interval = ticker(rt.config.timing.watchdog);
    loop {
        tokio::select! {
            biased;
            () = rt.cancel.cancelled() => break,
            _ = interval.tick() => {
                if rt.state.countdowns.current() == Some(CountdownKind::RouterConnect)
                    && rt.session.probe().await
                    && rt.state.countdowns.stop_kind(CountdownKind::RouterConnect, StopReason::Event)
                {
                    info!("router reachable again");
                }
            }
        }
    }
}

// ── Periodic data ────────────────────────────────────────────────────

/// Spawn the periodic task for `kind`; it runs until `cancel` fires.
pub(crate) fn spawn_data<B: Board>(
    rt: &Arc<Runtime<B>>,
    kind: DataKind,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    let rt = Arc::clone(rt);
    tokio::spawn(async move {
        debug!(%kind, "data task started");
        // The first tick completes immediately so the page fills at once.
        let mut interval = ticker(rt.config.timing.data_refresh);
        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                _ = interval.tick() => {
                    refresh_data(&rt, kind).await;
                    rt.send(Action::Render);
                }
            }
        }
        debug!(%kind, "data task stopped");
    })
}

async fn refresh_data<B: Board>(rt: &Arc<Runtime<B>>, kind: DataKind) {
    match kind {
        DataKind::Time => {
            let now = chrono::Local::now();
            rt.state.update(|d| {
                d.now = Some(now);
                d.loading = false;
            });
        }
        DataKind::FobInfo => {
            let fob = FobInfo {
                hardware_id: rt.board.hardware_id(),
                battery_percent: rt.board.battery_percent(),
                uptime_secs: rt.state.started.elapsed().as_secs(),
            };
            rt.state.update(|d| {
                d.fob = fob;
                d.loading = false;
            });
        }
        DataKind::WanInfo => {
            let id = rt.state.selected_wan();
            let wans = &rt.wans;
            let result = with_retry(move || wans.refresh(Some(id))).await;
            rt.state.update(|d| {
                d.loading = false;
                match result {
                    Ok(links) => {
                        d.wan_info = links.into_iter().find(|l| l.id == id);
                        d.unavailable = d.wan_info.is_none();
                    }
                    Err(e) => {
                        debug!(error = %e, wan_id = id, "WAN detail unavailable");
                        d.wan_info = None;
                        d.unavailable = true;
                    }
                }
            });
        }
        DataKind::WanSummary => {
            let wans = &rt.wans;
            let result = with_retry(move || wans.refresh(None)).await;
            rt.state.update(|d| {
                d.loading = false;
                match result {
                    Ok(links) => {
                        d.wan_summary = Arc::new(links);
                        d.unavailable = false;
                    }
                    Err(e) => {
                        debug!(error = %e, "WAN summary unavailable");
                        d.wan_summary = Arc::new(Vec::new());
                        d.unavailable = true;
                    }
                }
            });
        }
        DataKind::Ping => ping_targets(rt).await,
    }
}

async fn ping_targets<B: Board>(rt: &Arc<Runtime<B>>) {
    let targets = &rt.config.ping_targets;
    let answers = join_all(targets.iter().map(|t| rt.board.ping(t))).await;
    let results: Vec<PingResult> = targets
        .iter()
        .zip(answers)
        .map(|(target, reachable)| PingResult {
            target: target.clone(),
            reachable: Some(reachable),
        })
        .collect();

    if results.iter().any(|r| r.reachable == Some(true)) && rt.state.flags.end_boot() {
        info!("boot complete");
    }
    rt.state.update(|d| {
        d.ping = results;
        d.loading = false;
    });
}

// ── One-shot fetches ─────────────────────────────────────────────────

pub(crate) fn spawn_fetch<B: Board>(rt: &Arc<Runtime<B>>, fetch: Fetch) {
    let rt = Arc::clone(rt);
    tokio::spawn(async move {
        let session = &rt.session;
        match fetch {
            Fetch::RouterInfo => {
                let result = with_retry(move || session.system_info()).await;
                if let Err(e) = &result {
                    warn!(error = %e, "router info unavailable");
                }
                rt.state.update(|d| {
                    d.loading = false;
                    d.unavailable = result.is_err();
                    d.router_info = result.ok();
                });
            }
            Fetch::Location => {
                let result = with_retry(move || session.location()).await;
                if let Err(e) = &result {
                    warn!(error = %e, "router location unavailable");
                }
                rt.state.update(|d| {
                    d.loading = false;
                    d.unavailable = result.is_err();
                    d.location = result.ok();
                });
            }
            Fetch::WanList => {
                let wans = &rt.wans;
                if let Err(e) = with_retry(move || wans.refresh(None)).await {
                    warn!(error = %e, "WAN list unavailable");
                }
                rt.state.update(|d| d.loading = false);
                rt.send(Action::GoTo(PageId::WanList));
                return;
            }
        }
        rt.send(Action::Render);
    });
}

/// Scan for networks, then show the results.
pub(crate) fn spawn_scan<B: Board>(rt: &Arc<Runtime<B>>) {
    let rt = Arc::clone(rt);
    tokio::spawn(async move {
        let results = rt.board.scan().await;
        info!(found = results.len(), "Wi-Fi scan finished");
        rt.state.set_scan_results(results);
        rt.state.update(|d| d.loading = false);
        rt.send(Action::GoTo(PageId::ScanResults));
    });
}

/// Erase the credential jar, then start the reset countdown.
pub(crate) fn spawn_forget<B: Board>(rt: &Arc<Runtime<B>>) {
    let rt = Arc::clone(rt);
    tokio::spawn(async move {
        if let Err(e) = rt.session.forget().await {
            warn!(error = %e, "failed to erase router credentials");
        }
        rt.send(Action::StartCountdown(CountdownKind::FactoryReset));
    });
}
