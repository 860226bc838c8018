// ── Orchestrator actions ──
//
// Everything that changes what is on screen arrives at the UI actor as
// an `Action`. Item hooks, workers and countdown runners only send.

use crate::countdown::{CountdownKind, CountdownOutcome};
use crate::input::{Button, Press};
use crate::store::SsidSlot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
pub enum PageId {
    Countdown,
    Home,
    Wifi,
    WifiPrompt,
    ScanResults,
    SaveSsid,
    PingTargets,
    Router,
    RouterInfo,
    Location,
    WanList,
    WanInfo,
    WanSummary,
    SimList,
    SimInfo,
    Time,
    FobInfo,
    FactoryResetConfirm,
    RouterUnavailable,
}

/// What the periodic data worker keeps fresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum DataKind {
    Time,
    WanInfo,
    WanSummary,
    FobInfo,
    Ping,
}

/// One-shot router fetches, run off the UI actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum Fetch {
    RouterInfo,
    Location,
    /// Refresh the WAN list, then open the WAN list page.
    WanList,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// A classified button press from the input worker.
    Button(Button, Press),
    GoTo(PageId),
    /// Go back to the page before the current one.
    Back,

    StartCountdown(CountdownKind),
    /// A countdown was claimed elsewhere (a watchdog) and is running.
    CountdownStarted(CountdownKind),
    CountdownTick(CountdownKind, u64),
    CountdownFinished(CountdownKind, CountdownOutcome),

    StartData(DataKind),
    StopData,
    Fetch(Fetch),

    ConnectStation,
    StartAccessPoint,
    ScanWifi,
    /// Remember which scan result the user picked.
    PickScan(usize),
    SaveSsid(SsidSlot),
    FactoryReset,

    /// Data changed; redraw.
    Render,
    Quit,
}
