// ── UI actor ──
//
// Sole owner of the menu engine. Applies actions in arrival order,
// drains whatever queued up behind the first one, then publishes a
// single frame for the batch.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::board::Board;
use crate::countdown::{CountdownKind, CountdownOutcome, StopReason};
use crate::input::{Button, ButtonEvent, Press};
use crate::menu::{Color, Frame, FrameLine, MenuEngine};
use crate::store::SsidSlot;

use super::Runtime;
use super::action::{Action, DataKind, PageId};
use super::pages::{self, PageContext};
use super::workers;

pub(crate) struct UiActor<B> {
    rt: Arc<Runtime<B>>,
    engine: MenuEngine<PageId>,
    actions: mpsc::UnboundedReceiver<Action>,
    frames: watch::Sender<Frame>,
    /// The single periodic data task, if one is running.
    data: Option<(CancellationToken, JoinHandle<()>)>,
    /// Page to return to when a countdown ends without taking over.
    resume: Option<PageId>,
}

impl<B: Board> UiActor<B> {
    pub(crate) fn new(
        rt: Arc<Runtime<B>>,
        actions: mpsc::UnboundedReceiver<Action>,
        frames: watch::Sender<Frame>,
    ) -> Self {
        let ctx = PageContext {
            actions: rt.actions.clone(),
            state: Arc::clone(&rt.state),
            wans: Arc::clone(&rt.wans),
            ping_targets: rt.config.ping_targets.clone(),
        };
        Self {
            engine: pages::build(&ctx),
            rt,
            actions,
            frames,
            data: None,
            resume: None,
        }
    }

    pub(crate) async fn run(mut self) {
        self.navigate(PageId::Home);
        self.connect_station();
        self.publish();

        let cancel = self.rt.cancel.clone();
        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                action = self.actions.recv() => {
                    let Some(action) = action else { break };
                    self.handle(action);
                    while let Ok(action) = self.actions.try_recv() {
                        self.handle(action);
                    }
                    self.publish();
                }
            }
        }

        self.stop_data();
        debug!("UI actor stopped");
    }

    fn handle(&mut self, action: Action) {
        match action {
            Action::Button(button, press) => self.on_button(button, press),
            Action::GoTo(page) => self.navigate(page),
            Action::Back => self.back(),

            Action::StartCountdown(kind) => {
                let handle = self.rt.state.countdowns.begin(kind);
                workers::spawn_countdown(&self.rt, handle);
            }
            Action::CountdownStarted(_) => {
                let current = self.engine.current();
                if current != Some(PageId::Countdown) {
                    self.resume = current;
                    self.navigate(PageId::Countdown);
                }
            }
            Action::CountdownTick(kind, remaining) => {
                self.rt.state.update(|d| d.countdown = Some((kind, remaining)));
            }
            Action::CountdownFinished(kind, outcome) => self.on_countdown_finished(kind, outcome),

            Action::StartData(kind) => self.start_data(kind),
            Action::StopData => self.stop_data(),
            Action::Fetch(fetch) => {
                self.rt.state.update(|d| d.loading = true);
                workers::spawn_fetch(&self.rt, fetch);
            }

            Action::ConnectStation => {
                if self.engine.current() == Some(PageId::WifiPrompt) {
                    self.navigate(PageId::Wifi);
                }
                self.connect_station();
            }
            Action::StartAccessPoint => self.start_access_point(),
            Action::ScanWifi => {
                self.rt.state.update(|d| d.loading = true);
                workers::spawn_scan(&self.rt);
            }
            Action::PickScan(index) => {
                let ssid = self.rt.state.scan_results().get(index).map(|r| r.ssid.clone());
                self.rt.state.pick_ssid(ssid);
            }
            Action::SaveSsid(slot) => self.save_ssid(slot),
            Action::FactoryReset => {
                if let Err(e) = self.rt.settings.factory_reset() {
                    warn!(error = %e, "settings reset failed");
                }
                workers::spawn_forget(&self.rt);
            }

            Action::Render => {}
            Action::Quit => {
                info!("quit requested");
                self.rt.cancel.cancel();
            }
        }
    }

    // ── Buttons ──────────────────────────────────────────────────────

    fn on_button(&mut self, button: Button, press: Press) {
        match (button, press.event) {
            (Button::A, ButtonEvent::ShortPress) => self.engine.next(),
            (Button::A, ButtonEvent::LongPress) | (Button::B, ButtonEvent::ShortPress) => self.activate(),
            (Button::B, ButtonEvent::LongPress) => {
                if self.rt.state.countdowns.stop(StopReason::User) {
                    info!("countdown cancelled by user");
                }
            }
            (Button::C, ButtonEvent::ShortPress) => self.engine.prev(),
            (Button::C, ButtonEvent::LongPress) if press.held > self.rt.config.timing.shutdown_press => {
                self.handle(Action::StartCountdown(CountdownKind::Shutdown));
            }
            (Button::C, ButtonEvent::LongPress) | (_, ButtonEvent::None) => {}
        }
    }

    fn activate(&mut self) {
        if self.engine.current() == Some(PageId::Countdown) {
            return;
        }
        if !self.engine.activate() {
            self.back();
        }
    }

    // ── Navigation ───────────────────────────────────────────────────

    fn navigate(&mut self, page: PageId) {
        self.rt.state.update(|d| {
            d.unavailable = false;
            d.loading = false;
        });
        self.engine.go_to(page);
    }

    fn back(&mut self) {
        if let Some(target) = self.engine.current_page().and_then(|p| p.back) {
            self.navigate(target);
        }
    }

    fn resume(&mut self) {
        let page = self.resume.take().unwrap_or(PageId::Home);
        self.navigate(page);
    }

    // ── Countdown outcomes ───────────────────────────────────────────

    fn on_countdown_finished(&mut self, kind: CountdownKind, outcome: CountdownOutcome) {
        let rt = Arc::clone(&self.rt);
        let state = &rt.state;
        let taken_over = state.countdowns.is_running();
        if !taken_over {
            state.update(|d| d.countdown = None);
        }
        info!(%kind, ?outcome, "countdown finished");

        let wifi = &rt.config.wifi;
        match (kind, outcome) {
            // A newer countdown owns the screen now.
            (_, CountdownOutcome::SupersededByEvent) if taken_over => {}

            (CountdownKind::WifiConnect, CountdownOutcome::Completed)
                if state.flags.booting()
                    && !state.flags.primary_invalid()
                    && wifi.primary.is_some()
                    && wifi.secondary.is_some() =>
            {
                warn!("primary network failed; trying secondary");
                state.flags.set_primary_invalid(true);
                self.resume();
                self.connect_station();
            }
            (CountdownKind::WifiConnect, CountdownOutcome::Completed | CountdownOutcome::CancelledByUser) => {
                state.flags.set_wifi_timeout(true);
                self.navigate(PageId::WifiPrompt);
            }
            (CountdownKind::WifiConnect, CountdownOutcome::SupersededByEvent) => {
                if state.flags.booting() {
                    self.navigate(PageId::PingTargets);
                    state.router_release.signal(());
                } else {
                    self.resume();
                }
            }

            (CountdownKind::RouterConnect, CountdownOutcome::Completed) => {
                warn!("router unreachable past its countdown");
                state.flags.set_router_dead(true);
                self.navigate(PageId::RouterUnavailable);
            }
            (CountdownKind::RouterConnect, _) => self.resume(),

            (CountdownKind::Shutdown, CountdownOutcome::Completed) => {
                info!("powering off");
                rt.board.power_off();
            }
            (CountdownKind::Reboot | CountdownKind::FactoryReset, CountdownOutcome::Completed) => {
                info!("restarting");
                rt.board.restart();
            }
            (CountdownKind::Shutdown | CountdownKind::Reboot | CountdownKind::FactoryReset, _) => {
                self.resume = None;
                self.navigate(PageId::Home);
            }
        }
    }

    // ── Data tasks ───────────────────────────────────────────────────

    fn start_data(&mut self, kind: DataKind) {
        self.stop_data();
        self.rt.state.update(|d| d.loading = true);
        let cancel = self.rt.cancel.child_token();
        let task = workers::spawn_data(&self.rt, kind, cancel.clone());
        self.data = Some((cancel, task));
    }

    fn stop_data(&mut self) {
        if let Some((cancel, _task)) = self.data.take() {
            cancel.cancel();
        }
    }

    // ── Wi-Fi ────────────────────────────────────────────────────────

    /// Join the primary network, or the secondary once the primary was
    /// found invalid. Without any station network, fall back to AP mode.
    fn connect_station(&mut self) {
        let rt = Arc::clone(&self.rt);
        let wifi = &rt.config.wifi;
        let network = if rt.state.flags.primary_invalid() {
            wifi.secondary.as_ref()
        } else {
            wifi.primary.as_ref().or(wifi.secondary.as_ref())
        };
        let Some(network) = network else {
            warn!("no station network configured; starting access point");
            self.start_access_point();
            return;
        };

        info!(ssid = %network.ssid, "joining Wi-Fi");
        rt.state.flags.set_wifi_timeout(false);
        let ssid = network.ssid.clone();
        rt.state.update(|d| d.wifi.ssid = Some(ssid));
        rt.board.start_station(&network.ssid, &network.password);
    }

    fn start_access_point(&mut self) {
        let ap = &self.rt.config.wifi.access_point;
        info!(ssid = %ap.ssid, "starting access point");
        let ssid = ap.ssid.clone();
        self.rt.state.update(|d| d.wifi.ssid = Some(ssid));
        self.rt.board.start_access_point(&ap.ssid, &ap.password);
    }

    fn save_ssid(&mut self, slot: SsidSlot) {
        let Some(ssid) = self.rt.state.picked_ssid() else {
            warn!("no scanned network picked");
            self.navigate(PageId::Wifi);
            return;
        };
        match self.rt.settings.remember_ssid(slot, &ssid) {
            Ok(()) => info!(%slot, %ssid, "network remembered"),
            Err(e) => warn!(error = %e, %slot, "failed to remember network"),
        }
        self.rt.state.pick_ssid(None);
        self.navigate(PageId::Wifi);
    }

    // ── Output ───────────────────────────────────────────────────────

    fn publish(&mut self) {
        let mut frame = self.engine.render(self.rt.config.max_visible_items);
        if self.engine.current() != Some(PageId::Countdown) {
            let data = self.rt.state.data.borrow();
            if data.unavailable {
                frame.banner = Some(FrameLine::colored("Unavailable!", Color::Red));
            } else if data.loading {
                frame.banner = Some(FrameLine::colored("Loading...", Color::Yellow));
            }
        }
        self.frames.send_replace(frame);
    }
}
