//! Card transport abstraction.
//!
//! Defines the `CardTransport` trait for APDU exchange,
//! allowing different implementations (PC/SC, mock, etc.).

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::TransportError;

/// Response length cap used for every exchange in a session.
pub const DEFAULT_MAX_RESPONSE_LEN: usize = 256;

/// Largest response an extended-length APDU can carry (Le = 0x0000).
pub const MAX_RESPONSE_LEN: usize = 65536;

/// Card protocol identifier passed along with each APDU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    T0,
    T1,
    Raw,
    #[default]
    Any,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::T0 => write!(f, "T=0"),
            Protocol::T1 => write!(f, "T=1"),
            Protocol::Raw => write!(f, "RAW"),
            Protocol::Any => write!(f, "ANY"),
        }
    }
}

#[cfg(feature = "pcsc")]
impl From<Protocol> for pcsc::Protocols {
    fn from(protocol: Protocol) -> Self {
        match protocol {
            Protocol::T0 => pcsc::Protocols::T0,
            Protocol::T1 => pcsc::Protocols::T1,
            Protocol::Raw => pcsc::Protocols::RAW,
            Protocol::Any => pcsc::Protocols::ANY,
        }
    }
}

/// An open, connected session with a card.
///
/// A transport is owned by exactly one read session. `disconnect` consumes
/// it, so a handle can be released at most once.
pub trait CardTransport {
    /// Send one APDU and return the raw response, status word included.
    ///
    /// No retries happen at this layer.
    fn transmit(
        &mut self,
        command: &[u8],
        max_response_len: usize,
        protocol: Protocol,
    ) -> Result<Vec<u8>, TransportError>;

    /// Release the card.
    fn disconnect(self) -> Result<(), TransportError>
    where
        Self: Sized;
}
