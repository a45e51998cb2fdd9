//! Controller subsystem for gamepad input sampling
//!
//! Captures one input device's analog and digital state once per display
//! frame:
//!
//! 1. [`snapshot`] - Immutable per-frame snapshot type and the source seam
//! 2. [`sampler`] - gilrs-backed sampler with lifecycle states
//!
//! # Architecture
//!
//! ```text
//! Gamepad ──► InputSampler ──► InputSnapshot
//!             (buffered host state, one read per frame)
//! ```
//!
//! Sampling is non-blocking and runs synchronously inside the frame loop;
//! everything downstream (encoding, transmission) consumes the snapshot.

pub mod sampler;
pub mod snapshot;

pub use sampler::{InputSampler, SamplerError, SamplerSettings};
pub use snapshot::{InputSnapshot, SnapshotSource, TRACKED_BUTTONS};
