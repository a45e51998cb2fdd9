//! Gamepad sampler backed by gilrs.
//!
//! Reads the state of one input device once per display frame. Event draining
//! and state reads both work off gilrs' internal buffers, so a call is cheap
//! enough for 60-144 Hz sampling and never performs I/O of its own.

use gilrs::{Axis, Button, Event, EventType, Gamepad, GamepadId, Gilrs};
use statum::{machine, state};
use tracing::{debug, info, warn};

use super::snapshot::{InputSnapshot, SnapshotSource, TRACKED_BUTTONS};

/// Buttons read into the snapshot, in snapshot index order (A, B, X, Y).
///
/// gilrs names positions, not letters: South is A, East is B, West is X and
/// North is Y on a standard layout.
const BUTTON_ORDER: [Button; TRACKED_BUTTONS] =
    [Button::South, Button::East, Button::West, Button::North];

/// Sampler settings
#[derive(Clone, Debug)]
pub struct SamplerSettings {
    /// Analog stick deadzone as a fraction (0.0-1.0)
    ///
    /// Prevents stick drift by ignoring small movements near the center.
    /// Values outside the dead band are rescaled to preserve the full range.
    pub deadzone: f32,
}

impl Default for SamplerSettings {
    fn default() -> Self {
        Self { deadzone: 0.05 }
    }
}

/// Sampler errors
#[derive(Debug, thiserror::Error)]
pub enum SamplerError {
    /// The host platform exposes no device polling at all.
    ///
    /// Fatal for the feature: reported once at startup, the pipeline never
    /// starts. This is distinct from "no gamepad plugged in", which is an
    /// expected steady state.
    #[error("Gamepad polling unavailable on this platform: {0}")]
    PlatformUnsupported(String),
}

#[state]
#[derive(Debug, Clone)]
pub enum SamplerState {
    Initializing,
    Sampling,
}

/// Input sampler with a statum lifecycle.
///
/// Owns the gilrs context and the active-device slot; holds no state beyond
/// the last-read hardware buffers.
#[machine]
#[derive(Debug)]
pub struct InputSampler<S: SamplerState> {
    gilrs: Gilrs,
    active_gamepad: Option<GamepadId>,
    settings: SamplerSettings,
}

impl<S: SamplerState> InputSampler<S> {
    /// Caller-visible connectivity flag for the display surface.
    pub fn is_device_connected(&self) -> bool {
        self.active_gamepad.is_some()
    }

    /// Name of the active device, for human feedback only.
    pub fn device_name(&self) -> Option<String> {
        self.active_gamepad
            .map(|id| self.gilrs.gamepad(id).name().to_string())
    }
}

impl InputSampler<Initializing> {
    pub fn create(settings: Option<SamplerSettings>) -> Result<Self, SamplerError> {
        let settings = settings.unwrap_or_default();
        debug!("Creating input sampler with settings: {:?}", settings);

        let gilrs = match Gilrs::new() {
            Ok(g) => {
                info!("Gamepad interface initialized");
                g
            }
            Err(e) => {
                return Err(SamplerError::PlatformUnsupported(e.to_string()));
            }
        };

        Ok(Self::new(gilrs, None, settings))
    }

    /// Picks the first connected gamepad, if any, and transitions to Sampling.
    ///
    /// No device at this point is not an error; the frame loop keeps sampling
    /// passively and picks one up from the connect event later.
    pub fn initialize(mut self) -> InputSampler<Sampling> {
        let gamepads: Vec<(GamepadId, Gamepad<'_>)> = self.gilrs.gamepads().collect();

        if gamepads.is_empty() {
            info!("No gamepad connected, sampling passively until one appears");
        } else {
            for (id, gamepad) in &gamepads {
                info!("Found gamepad [{}]: {}", id, gamepad.name());
            }
            let (id, gamepad) = &gamepads[0];
            info!("Selected gamepad: {} ({})", gamepad.name(), id);
            self.active_gamepad = Some(*id);
        }

        self.transition()
    }
}

impl InputSampler<Sampling> {
    /// Drains buffered gilrs events to keep the cached gamepad state and the
    /// active-device slot current.
    fn pump_events(&mut self) {
        while let Some(Event { id, event, .. }) = self.gilrs.next_event() {
            match event {
                EventType::Connected => {
                    if self.active_gamepad.is_none() {
                        info!("Gamepad connected: {}", self.gilrs.gamepad(id).name());
                        self.active_gamepad = Some(id);
                    } else {
                        debug!("Ignoring additional gamepad: {:?}", id);
                    }
                }
                EventType::Disconnected => {
                    if self.active_gamepad == Some(id) {
                        warn!("Active gamepad disconnected: {:?}", id);
                        self.active_gamepad = None;
                    }
                }
                _ => {}
            }
        }
    }

    fn read_snapshot(&self, id: GamepadId) -> InputSnapshot {
        let gamepad = self.gilrs.gamepad(id);

        // A stick with no axis data at all yields an empty axis list, which
        // the encoders treat as a malformed frame.
        let axes = match (
            gamepad.axis_data(Axis::LeftStickX),
            gamepad.axis_data(Axis::LeftStickY),
        ) {
            (Some(x), Some(y)) => {
                let x = apply_deadzone(x.value(), self.settings.deadzone);
                // gilrs reports stick Y up-positive; the wire convention is
                // down-positive (y > 0 = backward).
                let y = apply_deadzone(-y.value(), self.settings.deadzone);
                vec![x, y]
            }
            _ => Vec::new(),
        };

        let mut buttons = [false; TRACKED_BUTTONS];
        for (slot, button) in buttons.iter_mut().zip(BUTTON_ORDER) {
            *slot = gamepad.is_pressed(button);
        }

        InputSnapshot::new(axes, buttons)
    }
}

impl SnapshotSource for InputSampler<Sampling> {
    fn sample(&mut self) -> Option<InputSnapshot> {
        self.pump_events();

        let id = self.active_gamepad?;
        if !self.gilrs.gamepad(id).is_connected() {
            return None;
        }
        Some(self.read_snapshot(id))
    }
}

/// Rescales an axis value to the range outside the dead band.
fn apply_deadzone(value: f32, deadzone: f32) -> f32 {
    if value.abs() < deadzone {
        0.0
    } else {
        let sign = if value < 0.0 { -1.0 } else { 1.0 };
        sign * (value.abs() - deadzone) / (1.0 - deadzone)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deadzone_zeroes_small_values() {
        assert_eq!(apply_deadzone(0.03, 0.05), 0.0);
        assert_eq!(apply_deadzone(-0.04, 0.05), 0.0);
    }

    #[test]
    fn deadzone_rescales_to_full_range() {
        // At the edge of the band the output starts at zero, at full
        // deflection it still reaches 1.0.
        assert!(apply_deadzone(0.05, 0.05).abs() < 1e-6);
        assert!((apply_deadzone(1.0, 0.05) - 1.0).abs() < 1e-6);
        assert!((apply_deadzone(-1.0, 0.05) + 1.0).abs() < 1e-6);
    }
}
