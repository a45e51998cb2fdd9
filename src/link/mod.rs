//! Wireless link subsystem
//!
//! Owns everything between an encoded command and the peripheral:
//!
//! 1. [`session`] - the established write capability (one peripheral, one
//!    channel), here a BLE-UART bridge module on a serial port
//! 2. [`transmitter`] - rate-limited writer with latest-wins semantics
//!
//! # Architecture
//!
//! ```text
//! CommandPayload ──► Transmitter ──► [slot, capacity 1] ──► writer task ──► LinkSession
//!                    (submit, sync)   (newest wins)          (min interval)
//! ```
//!
//! Pairing and service discovery happen out of band; this subsystem only
//! receives the already-negotiated write capability and never retries a
//! failed connection.

pub mod session;
pub mod transmitter;

pub use session::{LinkSession, UartSession};
pub use transmitter::{
    SubmitOutcome, Transmitter, TransmitterHandle, TransmitterSettings,
};

/// Link errors
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    /// The link device could not be opened.
    #[error("Failed to open link device {device}: {reason}")]
    OpenError { device: String, reason: String },

    /// A write to the peripheral failed; the session is no longer usable.
    #[error("Write to peripheral failed: {0}")]
    WriteError(String),
}
