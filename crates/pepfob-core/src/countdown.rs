// ── Countdowns ──
//
// Cancellable one-second-tick timers that drive deferred actions. Only
// one countdown is live at a time; the slot is claimed with an atomic
// compare-and-swap so two watchdogs can never both start one.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tracing::debug;

use crate::signal::Signal;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
pub enum CountdownKind {
    #[strum(serialize = "Connecting Wi-Fi")]
    WifiConnect,
    #[strum(serialize = "Connecting Router")]
    RouterConnect,
    #[strum(serialize = "Shutting Down")]
    Shutdown,
    #[strum(serialize = "Rebooting")]
    Reboot,
    #[strum(serialize = "Factory Reset")]
    FactoryReset,
}

impl CountdownKind {
    const fn code(self) -> u8 {
        match self {
            Self::WifiConnect => 1,
            Self::RouterConnect => 2,
            Self::Shutdown => 3,
            Self::Reboot => 4,
            Self::FactoryReset => 5,
        }
    }

    const fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::WifiConnect),
            2 => Some(Self::RouterConnect),
            3 => Some(Self::Shutdown),
            4 => Some(Self::Reboot),
            5 => Some(Self::FactoryReset),
            _ => None,
        }
    }
}

/// Why a countdown stopped before reaching zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    User,
    Event,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownOutcome {
    /// Reached zero without being stopped.
    Completed,
    CancelledByUser,
    /// Stopped because what it was waiting for happened, or replaced by
    /// a newer countdown.
    SupersededByEvent,
}

const IDLE: u8 = 0;

/// A claimed countdown. Owns its own stop signal.
#[derive(Debug, Clone)]
pub struct CountdownHandle {
    pub kind: CountdownKind,
    stop: Arc<Signal<StopReason>>,
}

/// The single countdown slot.
#[derive(Debug, Default)]
pub struct Countdowns {
    active: AtomicU8,
    stop: Mutex<Option<Arc<Signal<StopReason>>>>,
}

impl Countdowns {
    pub fn new() -> Self {
        Self::default()
    }

    /// Kind of the live countdown, if any.
    pub fn current(&self) -> Option<CountdownKind> {
        CountdownKind::from_code(self.active.load(Ordering::Acquire))
    }

    pub fn is_running(&self) -> bool {
        self.current().is_some()
    }

    /// Claim the slot only if it is idle.
    pub fn try_begin(&self, kind: CountdownKind) -> Option<CountdownHandle> {
        let mut guard = self.stop.lock().unwrap_or_else(PoisonError::into_inner);
        self.active
            .compare_exchange(IDLE, kind.code(), Ordering::AcqRel, Ordering::Acquire)
            .ok()?;
        let handle = CountdownHandle {
            kind,
            stop: Arc::new(Signal::new()),
        };
        *guard = Some(Arc::clone(&handle.stop));
        Some(handle)
    }

    /// Claim the slot unconditionally, superseding any live countdown.
    pub fn begin(&self, kind: CountdownKind) -> CountdownHandle {
        let mut guard = self.stop.lock().unwrap_or_else(PoisonError::into_inner);
        let previous = self.active.swap(kind.code(), Ordering::AcqRel);
        if let (Some(prev), Some(signal)) = (CountdownKind::from_code(previous), guard.as_ref()) {
            debug!(%prev, next = %kind, "superseding countdown");
            signal.signal(StopReason::Event);
        }
        let handle = CountdownHandle {
            kind,
            stop: Arc::new(Signal::new()),
        };
        *guard = Some(Arc::clone(&handle.stop));
        handle
    }

    /// Stop the live countdown, if any.
    pub fn stop(&self, reason: StopReason) -> bool {
        let guard = self.stop.lock().unwrap_or_else(PoisonError::into_inner);
        match guard.as_ref() {
            Some(signal) if self.is_running() => {
                signal.signal(reason);
                true
            }
            _ => false,
        }
    }

    /// Stop the live countdown only if it is of `kind`.
    pub fn stop_kind(&self, kind: CountdownKind, reason: StopReason) -> bool {
        self.current() == Some(kind) && self.stop(reason)
    }

    /// Release the slot held by `handle`. A handle that was superseded
    /// leaves the newer countdown alone.
    pub fn finish(&self, handle: &CountdownHandle) {
        let mut guard = self.stop.lock().unwrap_or_else(PoisonError::into_inner);
        let owns = guard.as_ref().is_some_and(|s| Arc::ptr_eq(s, &handle.stop));
        if owns {
            *guard = None;
            self.active.store(IDLE, Ordering::Release);
        }
    }
}

/// Run a countdown to completion or until its stop signal fires.
///
/// `on_tick` receives the remaining seconds, first with the full budget
/// and then after every elapsed second.
pub async fn run_countdown(
    handle: &CountdownHandle,
    budget: Duration,
    mut on_tick: impl FnMut(u64) + Send,
) -> CountdownOutcome {
    let mut remaining = budget.as_secs();
    on_tick(remaining);

    let mut interval = tokio::time::interval(Duration::from_secs(1));
    interval.tick().await;

    while remaining > 0 {
        tokio::select! {
            biased;
            reason = handle.stop.wait() => {
                return match reason {
                    StopReason::User => CountdownOutcome::CancelledByUser,
                    StopReason::Event => CountdownOutcome::SupersededByEvent,
                };
            }
            _ = interval.tick() => {
                remaining -= 1;
                on_tick(remaining);
            }
        }
    }
    CountdownOutcome::Completed
}

/// `mm:ss` readout.
pub fn format_mm_ss(secs: u64) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}
