// ── Shared device state ──
//
// The one aggregate every worker and page hook sees. Flags are atomics,
// fetched data is a `watch` snapshot that workers update and render hooks
// read, and small selections are atomics or short-lived mutexes. Nothing
// here performs I/O.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use chrono::{DateTime, Local};
use tokio::sync::watch;

use crate::board::{ScanResult, WifiMode, WifiStatus};
use crate::countdown::{CountdownKind, Countdowns};
use crate::model::{RouterInfo, RouterLocation, WanLink};
use crate::signal::Signal;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PingResult {
    pub target: String,
    /// `None` until the first attempt completes.
    pub reachable: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FobInfo {
    pub hardware_id: String,
    pub battery_percent: Option<u8>,
    pub uptime_secs: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WifiSnapshot {
    pub mode: WifiMode,
    pub status: WifiStatus,
    pub ssid: Option<String>,
    pub ip: Option<String>,
}

/// Data shown by pages, refreshed by workers.
#[derive(Debug, Clone, Default)]
pub struct DataSnapshot {
    pub now: Option<DateTime<Local>>,
    pub wifi: WifiSnapshot,
    /// Detail of the selected WAN.
    pub wan_info: Option<WanLink>,
    /// All WANs, for the summary page.
    pub wan_summary: Arc<Vec<WanLink>>,
    pub fob: FobInfo,
    pub ping: Vec<PingResult>,
    pub router_info: Option<RouterInfo>,
    pub location: Option<RouterLocation>,
    /// Last fetch for the visible page failed.
    pub unavailable: bool,
    /// A fetch for the visible page is in flight.
    pub loading: bool,
    /// Live countdown and its remaining seconds.
    pub countdown: Option<(CountdownKind, u64)>,
}

#[derive(Debug)]
pub struct DeviceFlags {
    /// Still in the power-on sequence (until a ping target answers).
    booting: AtomicBool,
    /// The station connect attempt timed out or was cancelled; the
    /// watchdog stays quiet until the user retries.
    wifi_timeout: AtomicBool,
    /// The primary station network failed during boot.
    primary_invalid: AtomicBool,
    /// `ensure_session` has succeeded since boot.
    session_ready: AtomicBool,
    /// The router was found unreachable past its countdown.
    router_dead: AtomicBool,
}

impl Default for DeviceFlags {
    fn default() -> Self {
        Self {
            booting: AtomicBool::new(true),
            wifi_timeout: AtomicBool::new(false),
            primary_invalid: AtomicBool::new(false),
            session_ready: AtomicBool::new(false),
            router_dead: AtomicBool::new(false),
        }
    }
}

impl DeviceFlags {
    pub fn booting(&self) -> bool {
        self.booting.load(Ordering::Acquire)
    }

    /// Leave the boot phase. Returns `true` only for the call that did it.
    pub fn end_boot(&self) -> bool {
        self.booting.swap(false, Ordering::AcqRel)
    }

    pub fn wifi_timeout(&self) -> bool {
        self.wifi_timeout.load(Ordering::Acquire)
    }

    pub fn set_wifi_timeout(&self, value: bool) {
        self.wifi_timeout.store(value, Ordering::Release);
    }

    pub fn primary_invalid(&self) -> bool {
        self.primary_invalid.load(Ordering::Acquire)
    }

    pub fn set_primary_invalid(&self, value: bool) {
        self.primary_invalid.store(value, Ordering::Release);
    }

    pub fn session_ready(&self) -> bool {
        self.session_ready.load(Ordering::Acquire)
    }

    pub fn set_session_ready(&self, value: bool) {
        self.session_ready.store(value, Ordering::Release);
    }

    pub fn router_dead(&self) -> bool {
        self.router_dead.load(Ordering::Acquire)
    }

    pub fn set_router_dead(&self, value: bool) {
        self.router_dead.store(value, Ordering::Release);
    }
}

pub struct SharedState {
    pub flags: DeviceFlags,
    pub data: watch::Sender<DataSnapshot>,
    pub countdowns: Countdowns,
    /// Released once Wi-Fi first connects during boot.
    pub router_release: Signal<()>,
    scan_results: Mutex<Vec<ScanResult>>,
    /// SSID picked from the scan results, waiting to be saved.
    picked_ssid: Mutex<Option<String>>,
    /// WAN id remembered when the WAN list closes.
    selected_wan: AtomicU8,
    /// SIM slot index remembered when the SIM list closes.
    selected_sim: AtomicU8,
    pub started: Instant,
}

impl std::fmt::Debug for SharedState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedState")
            .field("flags", &self.flags)
            .field("countdown", &self.countdowns.current())
            .finish_non_exhaustive()
    }
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedState {
    pub fn new() -> Self {
        let (data, _) = watch::channel(DataSnapshot::default());
        Self {
            flags: DeviceFlags::default(),
            data,
            countdowns: Countdowns::new(),
            router_release: Signal::new(),
            scan_results: Mutex::new(Vec::new()),
            picked_ssid: Mutex::new(None),
            selected_wan: AtomicU8::new(0),
            selected_sim: AtomicU8::new(0),
            started: Instant::now(),
        }
    }

    /// Current data snapshot.
    pub fn snapshot(&self) -> DataSnapshot {
        self.data.borrow().clone()
    }

    pub fn update(&self, f: impl FnOnce(&mut DataSnapshot)) {
        self.data.send_modify(f);
    }

    pub fn scan_results(&self) -> Vec<ScanResult> {
        self.scan_results
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_scan_results(&self, results: Vec<ScanResult>) {
        *self.scan_results.lock().unwrap_or_else(PoisonError::into_inner) = results;
    }

    pub fn pick_ssid(&self, ssid: Option<String>) {
        *self.picked_ssid.lock().unwrap_or_else(PoisonError::into_inner) = ssid;
    }

    pub fn picked_ssid(&self) -> Option<String> {
        self.picked_ssid
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn selected_wan(&self) -> u8 {
        self.selected_wan.load(Ordering::Acquire)
    }

    pub fn select_wan(&self, id: u8) {
        self.selected_wan.store(id, Ordering::Release);
    }

    pub fn selected_sim(&self) -> u8 {
        self.selected_sim.load(Ordering::Acquire)
    }

    pub fn select_sim(&self, slot: u8) {
        self.selected_sim.store(slot, Ordering::Release);
    }
}
