//! Command encoding for the wireless peripheral
//!
//! Maps one [`InputSnapshot`](crate::controller::InputSnapshot) to one
//! command payload of one or two bytes. Two incompatible policies exist:
//!
//! 1. [`discrete`] - single direction/action code byte
//! 2. [`radial`]   - direction code plus magnitude byte
//!
//! Exactly one policy is active per deployment, selected in the
//! configuration; they produce different wire formats and are never merged.

pub mod discrete;
pub mod radial;

use crate::controller::InputSnapshot;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The designated null code, emitted when no direction or action applies.
///
/// Shared by both policies and distinct from every directional and button
/// code.
pub const NEUTRAL_CODE: u8 = b'0';

/// Command payload for the peripheral: one or two bytes, nothing else.
///
/// Has no identity beyond its bytes. The link layer adds no framing,
/// checksum or acknowledgment around it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandPayload {
    bytes: [u8; 2],
    len: u8,
}

impl CommandPayload {
    /// Single code byte (discrete policy wire format).
    pub fn single(code: u8) -> Self {
        Self {
            bytes: [code, 0],
            len: 1,
        }
    }

    /// Code byte plus magnitude byte (radial policy wire format).
    pub fn pair(code: u8, magnitude: u8) -> Self {
        Self {
            bytes: [code, magnitude],
            len: 2,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len as usize]
    }
}

/// Selects which encoder maps snapshots to payloads.
///
/// Configured once per deployment; the pipeline never switches policies at
/// runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncodingPolicy {
    /// One code byte: buttons first, then stick direction past 0.9.
    Discrete,

    /// Two bytes: stick octant past 0.2 plus Euclidean magnitude.
    Radial,
}

impl EncodingPolicy {
    /// Encodes one snapshot, or `None` when the frame must be skipped
    /// (malformed axis data under either policy).
    pub fn encode(&self, snapshot: &InputSnapshot) -> Option<CommandPayload> {
        match self {
            EncodingPolicy::Discrete => discrete::encode(snapshot),
            EncodingPolicy::Radial => radial::encode(snapshot),
        }
    }
}

impl fmt::Display for EncodingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncodingPolicy::Discrete => write!(f, "discrete"),
            EncodingPolicy::Radial => write!(f, "radial"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_exposes_only_meaningful_bytes() {
        assert_eq!(CommandPayload::single(b'B').as_bytes(), &[b'B']);
        assert_eq!(CommandPayload::pair(b'A', 127).as_bytes(), &[b'A', 127]);
    }
}
