//! Discrete direction-code policy: one ASCII code byte per frame.
//!
//! Buttons always take priority over analog direction; among pressed buttons
//! the lowest snapshot index wins and later buttons are not inspected. The
//! stick only contributes when deflected past the 0.9 threshold.

use super::{CommandPayload, NEUTRAL_CODE};
use crate::controller::{InputSnapshot, TRACKED_BUTTONS};

/// Stick deflection required before an axis produces a direction code.
const AXIS_THRESHOLD: f32 = 0.9;

/// Code letters per button, in snapshot index order (A, B, X, Y).
const BUTTON_CODES: [u8; TRACKED_BUTTONS] = [b'A', b'B', b'X', b'Y'];

/// Encodes one snapshot into a single code byte.
///
/// Returns `None` for malformed axis data; the frame is skipped entirely,
/// button state included.
pub fn encode(snapshot: &InputSnapshot) -> Option<CommandPayload> {
    let (x, y) = snapshot.primary_stick()?;

    let code = snapshot
        .buttons
        .iter()
        .position(|&pressed| pressed)
        .map(|index| BUTTON_CODES[index])
        .unwrap_or_else(|| direction_code(x, y));

    Some(CommandPayload::single(code))
}

fn direction_code(x: f32, y: f32) -> u8 {
    if x > AXIS_THRESHOLD {
        b'B' // right
    } else if x < -AXIS_THRESHOLD {
        b'D' // left
    } else if y > AXIS_THRESHOLD {
        b'C' // down
    } else if y < -AXIS_THRESHOLD {
        b'A' // up
    } else {
        NEUTRAL_CODE
    }
}
