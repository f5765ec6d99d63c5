//! Mock card transport for testing.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use super::traits::{CardTransport, Protocol};
use crate::error::TransportError;

enum Scripted {
    Reply(Vec<u8>),
    Fail(String),
}

#[derive(Default)]
struct MockState {
    responses: VecDeque<Scripted>,
    commands: Vec<Vec<u8>>,
    disconnects: usize,
    fail_disconnect: bool,
}

/// Mock transport for driving sessions without a reader.
///
/// Clones share state, so a test can keep one handle while the session
/// owns (and finally disconnects) another.
#[derive(Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        // A poisoned lock only means another test thread panicked.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Queue a response to be returned by the next transmit.
    pub fn queue_response(&self, response: &[u8]) {
        self.state()
            .responses
            .push_back(Scripted::Reply(response.to_vec()));
    }

    /// Queue a transmit failure.
    pub fn queue_error(&self, message: impl Into<String>) {
        self.state()
            .responses
            .push_back(Scripted::Fail(message.into()));
    }

    /// Make the eventual disconnect fail.
    pub fn fail_disconnect(&self) {
        self.state().fail_disconnect = true;
    }

    /// All APDUs transmitted so far, in order.
    pub fn commands(&self) -> Vec<Vec<u8>> {
        self.state().commands.clone()
    }

    /// Number of times the transport was disconnected.
    pub fn disconnect_count(&self) -> usize {
        self.state().disconnects
    }

    /// Responses still waiting to be consumed.
    pub fn pending(&self) -> usize {
        self.state().responses.len()
    }
}

impl CardTransport for MockTransport {
    fn transmit(
        &mut self,
        command: &[u8],
        _max_response_len: usize,
        _protocol: Protocol,
    ) -> Result<Vec<u8>, TransportError> {
        let mut state = self.state();
        state.commands.push(command.to_vec());
        match state.responses.pop_front() {
            Some(Scripted::Reply(bytes)) => Ok(bytes),
            Some(Scripted::Fail(message)) => Err(TransportError::Transmit(message)),
            None => Err(TransportError::NoResponse {
                apdu: hex::encode_upper(command),
            }),
        }
    }

    fn disconnect(self) -> Result<(), TransportError> {
        let mut state = self.state();
        state.disconnects += 1;
        if state.fail_disconnect {
            return Err(TransportError::Disconnect("card removed".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_response_queue() {
        let mut mock = MockTransport::new();
        mock.queue_response(&[0x61, 0x0D]);
        mock.queue_error("reader unplugged");

        let first = mock.transmit(&[0x00, 0xA4], 256, Protocol::T0).unwrap();
        assert_eq!(first, vec![0x61, 0x0D]);

        let second = mock.transmit(&[0x00, 0xC0], 256, Protocol::T0);
        assert!(matches!(second, Err(TransportError::Transmit(_))));

        // Queue is empty now
        let third = mock.transmit(&[0x80, 0xB0], 256, Protocol::T0);
        match third {
            Err(TransportError::NoResponse { apdu }) => assert_eq!(apdu, "80B0"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_mock_records_commands() {
        let mut mock = MockTransport::new();
        let handle = mock.clone();
        mock.queue_response(&[0x90, 0x00]);
        mock.transmit(b"Hello", 256, Protocol::Any).unwrap();

        assert_eq!(handle.commands(), vec![b"Hello".to_vec()]);
        assert_eq!(handle.pending(), 0);
    }

    #[test]
    fn test_mock_disconnect() {
        let mock = MockTransport::new();
        let handle = mock.clone();
        mock.disconnect().unwrap();
        assert_eq!(handle.disconnect_count(), 1);

        let failing = MockTransport::new();
        failing.fail_disconnect();
        let handle = failing.clone();
        assert!(failing.disconnect().is_err());
        assert_eq!(handle.disconnect_count(), 1);
    }
}
