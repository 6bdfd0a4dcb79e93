// src/core/keyboard.rs
//! Keyboard event posting
//!
//! Events are posted one at a time with a short pause in between. The OS
//! drops or reorders key events that arrive faster than a plausible typing
//! rate; 9 ms was found by trial and error; the system key repeat interval
//! and threshold were both far too slow.

use std::fmt;
use std::str::FromStr;
use std::thread;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::trace;

use super::accessibility::Accessibility;
use super::backend::Backend;
use super::errors::{AxError, AxResult, ErrorHandler, Subject};
use super::handle::Element;

/// Pause between two posted key events.
pub const KEY_RATE: Duration = Duration::from_millis(9);

/// A virtual key going down (`pressed`) or up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyEvent {
    pub key_code: u16,
    pub pressed: bool,
}

impl KeyEvent {
    pub fn down(key_code: u16) -> Self {
        Self {
            key_code,
            pressed: true,
        }
    }

    pub fn up(key_code: u16) -> Self {
        Self {
            key_code,
            pressed: false,
        }
    }

    /// Down then up for each key code, the way a single key press is typed.
    pub fn taps(key_codes: &[u16]) -> Vec<KeyEvent> {
        key_codes
            .iter()
            .flat_map(|&code| [KeyEvent::down(code), KeyEvent::up(code)])
            .collect()
    }
}

impl From<(u16, bool)> for KeyEvent {
    fn from((key_code, pressed): (u16, bool)) -> Self {
        Self { key_code, pressed }
    }
}

impl fmt::Display for KeyEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = if self.pressed { "down" } else { "up" };
        write!(f, "{}:{}", self.key_code, state)
    }
}

/// Parses `"<code>:down"` / `"<code>:up"`, as printed by `Display`.
impl FromStr for KeyEvent {
    type Err = AxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || AxError::TypeMismatch {
            expected: "<key code>:down|up",
            actual: s.to_string(),
        };
        let (code, state) = s.split_once(':').ok_or_else(invalid)?;
        let key_code = code.trim().parse::<u16>().map_err(|_| invalid())?;
        let pressed = match state.trim() {
            "down" | "d" | "1" | "true" => true,
            "up" | "u" | "0" | "false" => false,
            _ => return Err(invalid()),
        };
        Ok(Self { key_code, pressed })
    }
}

impl<B: Backend, H: ErrorHandler> Accessibility<B, H> {
    /// Post `events` in order to `application`, or to the system-wide
    /// element for global input.
    ///
    /// The first failing post goes to the error handler and ends the
    /// sequence; later events are never sent.
    pub fn post_events(&self, application: &Element, events: &[KeyEvent]) -> AxResult<()> {
        for (index, event) in events.iter().enumerate() {
            if index > 0 {
                thread::sleep(KEY_RATE);
            }
            trace!("posting {} to {:?}", event, application);
            if let Err(status) =
                self.backend()
                    .post_keyboard_event(application, event.key_code, event.pressed)
            {
                return self.delegate(status, application, Subject::KeyEvent(*event));
            }
        }
        Ok(())
    }
}
