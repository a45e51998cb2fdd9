//! Frame-driven pipeline orchestration
//!
//! Ties the subsystems together, once per display frame:
//!
//! ```text
//! FrameTick ──► Sampler ──► Encoder ──► Transmitter
//!                  │
//!                  └──► snapshot watch (display surface, read-only)
//! ```
//!
//! The loop is driven by host frame ticks, not a fixed-rate timer: cadence
//! follows the display and may vary or pause. A transmitter that is still
//! waiting out its interval never stops the next frame from being sampled.

pub mod frame_loop;

pub use frame_loop::{FramePipeline, FrameTick, PipelineHandle};

/// Pipeline errors
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The host stopped delivering frame ticks without a shutdown signal.
    #[error("Frame tick source closed: {0}")]
    FrameSourceClosed(String),

    /// The pipeline task ended abnormally.
    #[error("Pipeline task error: {0}")]
    TaskError(String),
}
