//! Snapshot types shared between the sampler, the encoders and the display surface.

use chrono::{DateTime, Local};

/// Number of tracked buttons. Fixed index order: A, B, X, Y.
pub const TRACKED_BUTTONS: usize = 4;

/// One frame's worth of captured input device state.
///
/// Produced fresh on every sample and never mutated; a newer snapshot
/// supersedes an older one, they are not merged. Axis values follow the wire
/// convention: x right-positive, y down-positive (backward).
#[derive(Debug, Clone, PartialEq)]
pub struct InputSnapshot {
    /// Raw axis readings, primary stick at indices 0 and 1.
    ///
    /// Fewer than two entries means the device reported no usable stick; the
    /// encoders drop such frames instead of encoding garbage.
    pub axes: Vec<f32>,

    /// Tracked button states in fixed index order (A, B, X, Y).
    pub buttons: [bool; TRACKED_BUTTONS],

    /// Capture time of this snapshot.
    pub captured_at: DateTime<Local>,
}

impl InputSnapshot {
    pub fn new(axes: Vec<f32>, buttons: [bool; TRACKED_BUTTONS]) -> Self {
        Self {
            axes,
            buttons,
            captured_at: Local::now(),
        }
    }

    /// Primary stick position, or `None` when the axis data is malformed.
    pub fn primary_stick(&self) -> Option<(f32, f32)> {
        if self.axes.len() < 2 {
            return None;
        }
        Some((self.axes[0], self.axes[1]))
    }

}

/// Seam between the frame loop and whatever produces snapshots.
///
/// `sample` is called once per display frame and must stay non-blocking: it
/// may only read already-buffered host state. `None` means no input device is
/// currently delivering data.
pub trait SnapshotSource: Send {
    fn sample(&mut self) -> Option<InputSnapshot>;
}
