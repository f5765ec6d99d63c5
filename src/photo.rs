//! Photo assembly and encoding.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use tracing::debug;

use crate::apdu::PhotoChunkCommand;
use crate::error::TransportError;
use crate::sequencer::{strip_status_word, transmit, ExchangeSettings};
use crate::transport::CardTransport;

/// Read every photo chunk and concatenate them in order.
///
/// `on_chunk` is called after each chunk with the number of chunks read
/// so far.
pub fn assemble_photo<T, F>(
    transport: &mut T,
    chunks: &[PhotoChunkCommand],
    settings: ExchangeSettings,
    mut on_chunk: F,
) -> Result<Vec<u8>, TransportError>
where
    T: CardTransport,
    F: FnMut(usize),
{
    let mut photo = Vec::new();

    for (index, chunk) in chunks.iter().enumerate() {
        transmit(transport, &chunk.pointer, settings)?;
        let response = transmit(transport, &chunk.read, settings)?;
        photo.extend_from_slice(strip_status_word(&response));
        on_chunk(index + 1);
    }

    debug!(chunks = chunks.len(), bytes = photo.len(), "Photo assembled");
    Ok(photo)
}

/// Turns assembled photo bytes into the stored string form.
pub trait PhotoEncoder: Send + Sync {
    fn encode(&self, bytes: &[u8]) -> String;
}

/// Base64 payload of a JPEG data URI.
#[derive(Debug, Clone, Copy, Default)]
pub struct JpegBase64;

impl PhotoEncoder for JpegBase64 {
    fn encode(&self, bytes: &[u8]) -> String {
        STANDARD.encode(bytes)
    }
}
