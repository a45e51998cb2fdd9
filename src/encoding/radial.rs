//! Radial policy: direction code plus magnitude, two bytes per frame.
//!
//! Driven purely by the primary stick; button state is not consulted. The
//! stick classifies into one of eight octants (or neutral) with an
//! independent 0.2 threshold per axis, and the second byte carries the
//! Euclidean norm scaled to 0-255.
//!
//! Code letters continue the discrete policy's compass ordering:
//!
//! ```text
//!        H  A  E
//!        D  0  B        (y positive = backward)
//!        G  C  F
//! ```

use super::{CommandPayload, NEUTRAL_CODE};
use crate::controller::InputSnapshot;

/// Per-axis deflection required before the stick leaves the neutral band.
const AXIS_THRESHOLD: f32 = 0.2;

/// Encodes one snapshot into `[direction, magnitude]`.
///
/// Returns `None` for malformed axis data. A neutral classification still
/// emits the payload; the magnitude byte is computed from the raw vector
/// either way.
pub fn encode(snapshot: &InputSnapshot) -> Option<CommandPayload> {
    let (x, y) = snapshot.primary_stick()?;
    Some(CommandPayload::pair(octant_code(x, y), magnitude(x, y)))
}

fn octant_code(x: f32, y: f32) -> u8 {
    let forward = y < -AXIS_THRESHOLD;
    let backward = y > AXIS_THRESHOLD;
    let right = x > AXIS_THRESHOLD;
    let left = x < -AXIS_THRESHOLD;

    match (forward, backward, right, left) {
        (true, _, false, false) => b'A',
        (_, true, false, false) => b'C',
        (false, false, true, _) => b'B',
        (false, false, _, true) => b'D',
        (true, _, true, _) => b'E',
        (true, _, _, true) => b'H',
        (_, true, true, _) => b'F',
        (_, true, _, true) => b'G',
        _ => NEUTRAL_CODE,
    }
}

/// Euclidean norm scaled to `[0, 255]` and floored.
///
/// Clamped at 255 to guard against norms slightly above 1.0 on diagonal
/// input.
fn magnitude(x: f32, y: f32) -> u8 {
    let norm = (x * x + y * y).sqrt();
    (norm * 255.0).min(255.0).floor() as u8
}
