//! Thai national ID card reader.
//!
//! Drives a contact smart-card reader through the fixed APDU sequence of the
//! Thai ID applet, decodes the fixed-offset fields into an
//! [`IdentityRecord`] and reports progress as a stream of
//! [`ProgressEvent`]s.
//!
//! # Layers
//!
//! - **Transport**: APDU exchange abstraction (PC/SC, mock)
//! - **Sequencer**: multi-APDU commands, payload text decoding
//! - **Photo**: chunked photo assembly and encoding
//! - **Decode**: pure field decoders
//! - **Session**: the read state machine
//!
//! # Example
//!
//! ```no_run
//! # #[cfg(feature = "pcsc")]
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use std::sync::Arc;
//! use thai_id_card::{CardReader, CommandCatalog, ReadOptions, ReadSession, ShareMode, Protocol};
//!
//! let reader = CardReader::new()?;
//! let (transport, _name) = reader.connect_first(ShareMode::Shared, Protocol::Any)?;
//! let session = ReadSession::new(transport, Arc::new(CommandCatalog::thai_id()), ReadOptions::default());
//! let record = session.read()?;
//! println!("{} {}", record.first_name_en, record.last_name_en);
//! # Ok(())
//! # }
//! # #[cfg(not(feature = "pcsc"))]
//! # fn main() {}
//! ```

pub mod apdu;
pub mod config;
pub mod decode;
pub mod error;
pub mod photo;
#[cfg(feature = "pcsc")]
pub mod reader;
pub mod sequencer;
pub mod session;
pub mod tis620;
pub mod transport;
pub mod types;

#[cfg(feature = "node")]
mod node;

pub use apdu::{Apdu, CommandCatalog, PhotoChunkCommand};
pub use config::{ReaderConfig, ShareMode};
pub use error::{ConfigError, DecodeError, ReadError, TransportError};
pub use photo::{JpegBase64, PhotoEncoder};
#[cfg(feature = "pcsc")]
pub use reader::CardReader;
pub use sequencer::ExchangeSettings;
pub use session::{
    run_in_background, spawn_read, FnSink, NullSink, ProgressSink, ReadOptions, ReadSession, TracingSink,
};
pub use transport::{CardTransport, MockTransport, Protocol};
pub use types::{
    AddressParts, CardStatus, Gender, IdentityRecord, PersonName, ProgressEvent, ReadStep,
    ReadingProgress,
};

/// Get library version
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
