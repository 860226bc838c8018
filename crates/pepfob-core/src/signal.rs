// ── Single-slot signal ──
//
// Overwrite-on-send hand-off between tasks: a newer value replaces one
// that was never taken, and a waiter receives only the latest. Used
// where duplicate notifications should coalesce (countdown stop
// requests, watchdog release).

use std::sync::{Mutex, PoisonError};

use tokio::sync::Notify;

#[derive(Debug, Default)]
pub struct Signal<T> {
    slot: Mutex<Option<T>>,
    notify: Notify,
}

impl<T> Signal<T> {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
            notify: Notify::new(),
        }
    }

    /// Store `value`, replacing any unconsumed one, and wake a waiter.
    pub fn signal(&self, value: T) {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(value);
        self.notify.notify_one();
    }

    /// Take the pending value without waiting.
    pub fn try_take(&self) -> Option<T> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner).take()
    }

    /// Whether a value is pending.
    pub fn signaled(&self) -> bool {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Drop any pending value.
    pub fn reset(&self) {
        self.try_take();
    }

    /// Wait for the next value.
    pub async fn wait(&self) -> T {
        loop {
            let notified = self.notify.notified();
            if let Some(value) = self.try_take() {
                return value;
            }
            notified.await;
        }
    }
}
