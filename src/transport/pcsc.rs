//! PC/SC card transport.

use pcsc::{Card, Disposition};
use tracing::debug;

use super::traits::{CardTransport, Protocol, MAX_RESPONSE_LEN};
use crate::error::TransportError;

/// A connected PC/SC card.
pub struct PcscTransport {
    card: Card,
    protocol: Protocol,
}

impl PcscTransport {
    pub(crate) fn new(card: Card, protocol: Protocol) -> Self {
        Self { card, protocol }
    }

    /// Get ATR (Answer To Reset) - identifies card type
    pub fn atr(&self) -> Option<Vec<u8>> {
        let status = self.card.status2_owned().ok()?;
        if status.atr().is_empty() {
            None
        } else {
            Some(status.atr().to_vec())
        }
    }
}

impl CardTransport for PcscTransport {
    fn transmit(
        &mut self,
        command: &[u8],
        max_response_len: usize,
        protocol: Protocol,
    ) -> Result<Vec<u8>, TransportError> {
        if protocol != self.protocol && protocol != Protocol::Any {
            // PC/SC transmits with the protocol negotiated at connect time.
            debug!(requested = %protocol, active = %self.protocol, "Protocol differs from connection");
        }

        let mut response = vec![0u8; max_response_len.min(MAX_RESPONSE_LEN) + 2]; // +2 for status word
        let response_data = self
            .card
            .transmit(command, &mut response)
            .map_err(|e| TransportError::Transmit(e.to_string()))?;

        Ok(response_data.to_vec())
    }

    fn disconnect(self) -> Result<(), TransportError> {
        self.card
            .disconnect(Disposition::LeaveCard)
            .map_err(|(_card, e)| TransportError::Disconnect(e.to_string()))
    }
}
