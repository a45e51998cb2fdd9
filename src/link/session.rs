//! Established link sessions.
//!
//! A [`LinkSession`] is the opaque capability left over once pairing and
//! service discovery have completed elsewhere: a single write primitive bound
//! to one peripheral. The concrete session here talks to a BLE-UART
//! transparent bridge module (HM-10 class) over a serial port; the module
//! forwards every byte to its paired peripheral characteristic unchanged.

use async_trait::async_trait;
use rppal::uart::{Parity, Uart};
use tracing::{debug, info};

use super::LinkError;

/// Write capability for one live bidirectional channel to one peripheral.
///
/// Implementations must not buffer or reorder: the transmitter already
/// serializes writes and enforces their spacing.
#[async_trait]
pub trait LinkSession: Send {
    /// Writes one command payload. No framing, no acknowledgment; an error
    /// means the session is no longer usable.
    async fn write(&mut self, payload: &[u8]) -> Result<(), LinkError>;

    /// Peripheral identifier for log output.
    fn peripheral(&self) -> &str;
}

/// Serial-attached BLE-UART bridge session.
pub struct UartSession {
    uart: Uart,
    peripheral: String,
}

impl UartSession {
    /// Opens the bridge module's serial port in blocking write mode.
    ///
    /// Payloads are one or two bytes, so a blocking write completes within a
    /// character time or two at any sane baud rate.
    pub fn open(device: &str, baud_rate: u32) -> Result<Self, LinkError> {
        let open_error = |reason: String| LinkError::OpenError {
            device: device.to_string(),
            reason,
        };

        let mut uart = Uart::with_path(device, baud_rate, Parity::None, 8, 1)
            .map_err(|e| open_error(e.to_string()))?;
        uart.set_write_mode(true)
            .map_err(|e| open_error(e.to_string()))?;

        info!("Link session established on {} at {} baud", device, baud_rate);
        Ok(Self {
            uart,
            peripheral: device.to_string(),
        })
    }
}

#[async_trait]
impl LinkSession for UartSession {
    async fn write(&mut self, payload: &[u8]) -> Result<(), LinkError> {
        let written = self
            .uart
            .write(payload)
            .map_err(|e| LinkError::WriteError(e.to_string()))?;

        if written != payload.len() {
            return Err(LinkError::WriteError(format!(
                "short write: {} of {} bytes",
                written,
                payload.len()
            )));
        }

        debug!("Wrote {} byte(s) to {}", payload.len(), self.peripheral);
        Ok(())
    }

    fn peripheral(&self) -> &str {
        &self.peripheral
    }
}
