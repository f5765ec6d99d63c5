//! Transport layer module.

pub mod mock;
#[cfg(feature = "pcsc")]
pub mod pcsc;
pub mod traits;

pub use mock::MockTransport;
#[cfg(feature = "pcsc")]
pub use self::pcsc::PcscTransport;
pub use traits::{CardTransport, Protocol, DEFAULT_MAX_RESPONSE_LEN, MAX_RESPONSE_LEN};
