//! Simulated board: a virtual Wi-Fi radio, buzzer and power switch.
//!
//! Station joins complete after a delay on a background task. Each
//! `start_station`/`stop_wifi` bumps a generation counter so a join that
//! was superseded never lands.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use secrecy::SecretString;
use tokio::sync::watch;
use tracing::{debug, info};

use pepfob_core::{Board, ScanResult, WifiMode, WifiStatus};

/// Why the simulated device stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Halt {
    PowerOff,
    Restart,
}

#[derive(Debug, Clone)]
pub struct SimOptions {
    /// How long a station join takes.
    pub join_delay: Duration,
    /// Networks whose join always fails.
    pub failing_ssids: Vec<String>,
    pub battery_percent: u8,
}

impl Default for SimOptions {
    fn default() -> Self {
        Self {
            join_delay: Duration::from_secs(2),
            failing_ssids: Vec::new(),
            battery_percent: 87,
        }
    }
}

#[derive(Debug, Default)]
struct Radio {
    mode: WifiMode,
    status: WifiStatus,
    ssid: Option<String>,
}

struct Inner {
    options: SimOptions,
    radio: Mutex<Radio>,
    generation: AtomicU64,
    beeps: AtomicU64,
    last_beep: Mutex<Option<Instant>>,
    halt: watch::Sender<Option<Halt>>,
}

#[derive(Clone)]
pub struct SimBoard {
    inner: Arc<Inner>,
}

impl SimBoard {
    pub fn new(options: SimOptions) -> Self {
        let (halt, _) = watch::channel(None);
        Self {
            inner: Arc::new(Inner {
                options,
                radio: Mutex::new(Radio::default()),
                generation: AtomicU64::new(0),
                beeps: AtomicU64::new(0),
                last_beep: Mutex::new(None),
                halt,
            }),
        }
    }

    fn radio(&self) -> std::sync::MutexGuard<'_, Radio> {
        self.inner.radio.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Resolves to the halt reason once the device powers off or restarts.
    pub fn halted(&self) -> watch::Receiver<Option<Halt>> {
        self.inner.halt.subscribe()
    }

    /// Power-on state after a restart: radio off, no pending halt.
    pub fn reset(&self) {
        self.stop_wifi();
        self.inner.halt.send_replace(None);
    }

    pub fn ssid(&self) -> Option<String> {
        self.radio().ssid.clone()
    }

    pub fn beeps(&self) -> u64 {
        self.inner.beeps.load(Ordering::Relaxed)
    }

    /// Whether the buzzer sounded within `window`.
    pub fn beeping(&self, window: Duration) -> bool {
        self.inner
            .last_beep
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some_and(|at| at.elapsed() < window)
    }
}

impl Board for SimBoard {
    fn wifi_mode(&self) -> WifiMode {
        self.radio().mode
    }

    fn wifi_status(&self) -> WifiStatus {
        self.radio().status
    }

    fn wifi_ip(&self) -> Option<String> {
        let radio = self.radio();
        (radio.mode == WifiMode::Station && radio.status == WifiStatus::Connected)
            .then(|| "192.168.50.23".to_owned())
    }

    fn start_station(&self, ssid: &str, _password: &SecretString) {
        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        {
            let mut radio = self.radio();
            radio.mode = WifiMode::Station;
            radio.status = WifiStatus::Connecting;
            radio.ssid = Some(ssid.to_owned());
        }
        info!(ssid, "station join started");

        let fails = self.inner.options.failing_ssids.iter().any(|s| s == ssid);
        let delay = self.inner.options.join_delay;
        let board = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if board.inner.generation.load(Ordering::SeqCst) != generation {
                return;
            }
            let status = if fails { WifiStatus::Failed } else { WifiStatus::Connected };
            board.radio().status = status;
            debug!(%status, "station join settled");
        });
    }

    fn start_access_point(&self, ssid: &str, _password: &SecretString) {
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        let mut radio = self.radio();
        radio.mode = WifiMode::AccessPoint;
        radio.status = WifiStatus::Idle;
        radio.ssid = Some(ssid.to_owned());
        info!(ssid, "access point up");
    }

    fn stop_wifi(&self) {
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        let mut radio = self.radio();
        radio.mode = WifiMode::Off;
        radio.status = WifiStatus::Idle;
        radio.ssid = None;
    }

    async fn scan(&self) -> Vec<ScanResult> {
        tokio::time::sleep(Duration::from_millis(800)).await;
        [("Peplink_Office", -48, true), ("cafe-guest", -67, false), ("Field-Hotspot", -74, true)]
            .into_iter()
            .map(|(ssid, rssi, secured)| ScanResult {
                ssid: ssid.into(),
                rssi,
                secured,
            })
            .collect()
    }

    async fn ping(&self, target: &str) -> bool {
        tokio::time::sleep(Duration::from_millis(40)).await;
        let up = self.wifi_ip().is_some();
        debug!(host = target, up, "ping");
        up
    }

    fn beep(&self) {
        self.inner.beeps.fetch_add(1, Ordering::Relaxed);
        *self.inner.last_beep.lock().unwrap_or_else(PoisonError::into_inner) = Some(Instant::now());
    }

    fn power_off(&self) {
        info!("power off");
        self.inner.halt.send_replace(Some(Halt::PowerOff));
    }

    fn restart(&self) {
        info!("restart");
        self.inner.halt.send_replace(Some(Halt::Restart));
    }

    fn battery_percent(&self) -> Option<u8> {
        Some(self.inner.options.battery_percent)
    }

    fn hardware_id(&self) -> String {
        format!("SIM-{:08X}", std::process::id())
    }
}
