// ── Button input state machine ──
//
// Turns raw press/release edges of the three device buttons into latched
// short/long press events. Timing is driven by caller-supplied instants
// so the machine stays deterministic under test.

use std::time::{Duration, Instant};

/// One of the three physical buttons. `C` doubles as the power button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumIter)]
pub enum Button {
    A,
    B,
    C,
}

/// Classified press, latched until taken.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ButtonEvent {
    #[default]
    None,
    ShortPress,
    LongPress,
}

/// A raw edge from the hardware (or the simulator keyboard).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawEdge {
    pub button: Button,
    pub pressed: bool,
    pub at: Instant,
}

/// A taken event together with how long the button was held.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Press {
    pub event: ButtonEvent,
    pub held: Duration,
}

#[derive(Debug, Default)]
struct ButtonState {
    pressed_at: Option<Instant>,
    event: ButtonEvent,
    held: Duration,
    long_press_emitted: bool,
}

#[derive(Debug)]
pub struct ButtonInputStateMachine {
    threshold: Duration,
    a: ButtonState,
    b: ButtonState,
    c: ButtonState,
}

impl ButtonInputStateMachine {
    /// Presses held strictly longer than `threshold` are long presses.
    pub fn new(threshold: Duration) -> Self {
        Self {
            threshold,
            a: ButtonState::default(),
            b: ButtonState::default(),
            c: ButtonState::default(),
        }
    }

    fn state(&mut self, button: Button) -> &mut ButtonState {
        match button {
            Button::A => &mut self.a,
            Button::B => &mut self.b,
            Button::C => &mut self.c,
        }
    }

    pub fn feed(&mut self, edge: RawEdge) {
        if edge.pressed {
            self.press(edge.button, edge.at);
        } else {
            self.release(edge.button, edge.at);
        }
    }

    /// Press edge: start timing. A repeated press edge without a release
    /// keeps the original start.
    pub fn press(&mut self, button: Button, at: Instant) {
        let state = self.state(button);
        if state.pressed_at.is_none() {
            state.pressed_at = Some(at);
            state.long_press_emitted = false;
        }
    }

    /// Release edge: classify and latch. A release without a press is
    /// ignored.
    pub fn release(&mut self, button: Button, at: Instant) -> ButtonEvent {
        let threshold = self.threshold;
        let state = self.state(button);
        let Some(pressed_at) = state.pressed_at.take() else {
            return ButtonEvent::None;
        };
        let held = at.saturating_duration_since(pressed_at);
        state.event = if held > threshold {
            ButtonEvent::LongPress
        } else {
            ButtonEvent::ShortPress
        };
        state.held = held;
        state.long_press_emitted = false;
        state.event
    }

    /// Sample a held button. Returns `true` exactly once per press, the
    /// first time it is sampled past the long-press threshold (courtesy
    /// tone).
    pub fn poll_hold(&mut self, button: Button, now: Instant) -> bool {
        let threshold = self.threshold;
        let state = self.state(button);
        match state.pressed_at {
            Some(at) if !state.long_press_emitted && now.saturating_duration_since(at) > threshold => {
                state.long_press_emitted = true;
                true
            }
            _ => false,
        }
    }

    /// Take the latched event, resetting it to `None`.
    pub fn take(&mut self, button: Button) -> Option<Press> {
        let state = self.state(button);
        let event = std::mem::take(&mut state.event);
        (event != ButtonEvent::None).then_some(Press {
            event,
            held: state.held,
        })
    }

    /// Whether a button is currently down.
    pub fn is_held(&self, button: Button) -> bool {
        match button {
            Button::A => self.a.pressed_at.is_some(),
            Button::B => self.b.pressed_at.is_some(),
            Button::C => self.c.pressed_at.is_some(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const THRESHOLD: Duration = Duration::from_millis(300);

    fn press_for(machine: &mut ButtonInputStateMachine, button: Button, ms: u64) -> ButtonEvent {
        let t0 = Instant::now();
        machine.press(button, t0);
        machine.release(button, t0 + Duration::from_millis(ms))
    }

    #[test]
    fn press_at_threshold_is_short() {
        let mut machine = ButtonInputStateMachine::new(THRESHOLD);
        assert_eq!(press_for(&mut machine, Button::A, 300), ButtonEvent::ShortPress);
    }

    #[test]
    fn press_past_threshold_is_long() {
        let mut machine = ButtonInputStateMachine::new(THRESHOLD);
        assert_eq!(press_for(&mut machine, Button::B, 301), ButtonEvent::LongPress);
    }

    #[test]
    fn event_is_consumed_once() {
        let mut machine = ButtonInputStateMachine::new(THRESHOLD);
        press_for(&mut machine, Button::C, 1200);
        let press = machine.take(Button::C).unwrap();
        assert_eq!(press.event, ButtonEvent::LongPress);
        assert_eq!(press.held, Duration::from_millis(1200));
        assert!(machine.take(Button::C).is_none());
    }

    #[test]
    fn courtesy_tone_fires_once_per_hold() {
        let mut machine = ButtonInputStateMachine::new(THRESHOLD);
        let t0 = Instant::now();
        machine.press(Button::A, t0);
        assert!(!machine.poll_hold(Button::A, t0 + Duration::from_millis(100)));
        assert!(machine.poll_hold(Button::A, t0 + Duration::from_millis(310)));
        assert!(!machine.poll_hold(Button::A, t0 + Duration::from_millis(400)));
        machine.release(Button::A, t0 + Duration::from_millis(500));

        let t1 = t0 + Duration::from_secs(1);
        machine.press(Button::A, t1);
        assert!(machine.poll_hold(Button::A, t1 + Duration::from_millis(350)));
    }

    #[test]
    fn stray_release_is_ignored() {
        let mut machine = ButtonInputStateMachine::new(THRESHOLD);
        assert_eq!(machine.release(Button::B, Instant::now()), ButtonEvent::None);
        assert!(machine.take(Button::B).is_none());
    }

    #[test]
    fn buttons_are_independent() {
        let mut machine = ButtonInputStateMachine::new(THRESHOLD);
        let t0 = Instant::now();
        machine.press(Button::A, t0);
        machine.press(Button::B, t0);
        machine.release(Button::B, t0 + Duration::from_millis(50));
        assert!(machine.is_held(Button::A));
        assert_eq!(machine.take(Button::B).unwrap().event, ButtonEvent::ShortPress);
        assert!(machine.take(Button::A).is_none());
    }
}
