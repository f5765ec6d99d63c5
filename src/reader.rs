//! PC/SC reader discovery and connection.

use pcsc::{Context, ReaderState, Scope, State};
use std::ffi::CString;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::config::ShareMode;
use crate::error::TransportError;
use crate::transport::{PcscTransport, Protocol};
use crate::types::CardStatus;

/// Card reader wrapper for managing PC/SC connections
#[derive(Clone)]
pub struct CardReader {
    ctx: Context,
}

impl CardReader {
    /// Establish a user-scope PC/SC context.
    pub fn new() -> Result<Self, TransportError> {
        let ctx = Context::establish(Scope::User)
            .map_err(|e| TransportError::Context(e.to_string()))?;
        Ok(Self { ctx })
    }

    /// List available card readers
    pub fn list_readers(&self) -> Result<Vec<String>, TransportError> {
        let mut buffer = vec![0u8; 2048];
        let readers = self.ctx.list_readers(&mut buffer)?;
        Ok(readers.map(|r| r.to_string_lossy().to_string()).collect())
    }

    fn find_reader(&self, reader_name: &str) -> Result<CString, TransportError> {
        let mut buffer = vec![0u8; 2048];
        let mut readers = self.ctx.list_readers(&mut buffer)?;
        readers
            .find(|r| r.to_string_lossy() == reader_name)
            .map(|r| r.to_owned())
            .ok_or_else(|| TransportError::ReaderNotFound(reader_name.to_string()))
    }

    /// Get card status for a specific reader
    pub fn card_status(&self, reader_name: &str) -> Result<CardStatus, TransportError> {
        let reader = self.find_reader(reader_name)?;
        let mut reader_states = vec![ReaderState::new(reader, State::UNAWARE)];
        self.ctx
            .get_status_change(Duration::from_secs(0), &mut reader_states)?;
        Ok(card_status_of(reader_states[0].event_state()))
    }

    /// Block until a card is present in the reader or the timeout elapses.
    ///
    /// Returns the last observed status either way.
    pub fn wait_for_card(
        &self,
        reader_name: &str,
        timeout: Duration,
    ) -> Result<CardStatus, TransportError> {
        let reader = self.find_reader(reader_name)?;
        let deadline = Instant::now() + timeout;
        let mut reader_states = vec![ReaderState::new(reader, State::UNAWARE)];

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.ctx.get_status_change(remaining, &mut reader_states) {
                Ok(()) => {}
                Err(pcsc::Error::Timeout) => {
                    return Ok(card_status_of(reader_states[0].event_state()));
                }
                Err(e) => return Err(e.into()),
            }

            let state = reader_states[0].event_state();
            debug!(reader = reader_name, state = ?state, "Reader state changed");
            if state.contains(State::PRESENT) || remaining.is_zero() {
                return Ok(card_status_of(state));
            }
            reader_states[0].sync_current_state();
        }
    }

    /// Connect to a card in the named reader.
    pub fn connect(
        &self,
        reader_name: &str,
        share_mode: ShareMode,
        protocol: Protocol,
    ) -> Result<PcscTransport, TransportError> {
        let reader = self.find_reader(reader_name)?;
        let card = self
            .ctx
            .connect(&reader, share_mode.into(), protocol.into())
            .map_err(|e| TransportError::Connect(e.to_string()))?;

        info!(reader = reader_name, protocol = %protocol, "Connected to card");
        Ok(PcscTransport::new(card, protocol))
    }

    /// Connect to the first available reader
    pub fn connect_first(
        &self,
        share_mode: ShareMode,
        protocol: Protocol,
    ) -> Result<(PcscTransport, String), TransportError> {
        let reader_name = self
            .list_readers()?
            .into_iter()
            .next()
            .ok_or_else(|| TransportError::ReaderNotFound("no readers available".into()))?;
        let transport = self.connect(&reader_name, share_mode, protocol)?;
        Ok((transport, reader_name))
    }
}

fn card_status_of(state: State) -> CardStatus {
    CardStatus {
        present: state.contains(State::PRESENT),
        empty: state.contains(State::EMPTY),
        mute: state.contains(State::MUTE),
    }
}
