//! Command sequencing over a card transport.

use tracing::debug;

use crate::apdu::Apdu;
use crate::error::{ReadError, TransportError};
use crate::tis620;
use crate::transport::{CardTransport, Protocol, DEFAULT_MAX_RESPONSE_LEN};

/// Parameters applied to every APDU exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExchangeSettings {
    pub max_response_len: usize,
    pub protocol: Protocol,
}

impl Default for ExchangeSettings {
    fn default() -> Self {
        Self {
            max_response_len: DEFAULT_MAX_RESPONSE_LEN,
            protocol: Protocol::Any,
        }
    }
}

/// Drop the trailing status word (SW1 SW2) from a response longer than
/// two bytes. Shorter responses are returned as-is.
pub fn strip_status_word(response: &[u8]) -> &[u8] {
    if response.len() > 2 {
        &response[..response.len() - 2]
    } else {
        response
    }
}

/// Send one APDU.
pub fn transmit<T: CardTransport>(
    transport: &mut T,
    apdu: &Apdu,
    settings: ExchangeSettings,
) -> Result<Vec<u8>, TransportError> {
    let response = transport.transmit(apdu.as_bytes(), settings.max_response_len, settings.protocol)?;
    debug!(
        apdu = %hex::encode_upper(apdu.as_bytes()),
        len = response.len(),
        sw = %hex::encode_upper(&response[response.len().saturating_sub(2)..]),
        "APDU exchanged"
    );
    Ok(response)
}

/// Send every APDU of a logical command in order and decode the last
/// response as text.
///
/// Earlier responses only set up card context and are discarded.
pub fn send_command<T: CardTransport>(
    transport: &mut T,
    name: &'static str,
    command: &[Apdu],
    settings: ExchangeSettings,
) -> Result<String, ReadError> {
    let mut last = None;
    for apdu in command {
        last = Some(transmit(transport, apdu, settings)?);
    }
    let response = last.ok_or(ReadError::EmptyCommand { name })?;
    Ok(tis620::decode(strip_status_word(&response)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MockTransport;

    #[test]
    fn test_strip_status_word() {
        assert_eq!(strip_status_word(&[1, 2, 3, 0x90, 0x00]), &[1, 2, 3]);
        assert_eq!(strip_status_word(&[1, 0x90, 0x00]), &[1]);
        assert_eq!(strip_status_word(&[0x90, 0x00]), &[0x90, 0x00]);
        assert!(strip_status_word(&[]).is_empty());
    }

    #[test]
    fn test_send_command_uses_last_response() {
        let mut mock = MockTransport::new();
        mock.queue_response(&[0x61, 0x0D]);
        mock.queue_response(b"1103700012345\x90\x00");

        let command = vec![
            Apdu::from([0x80, 0xB0, 0x00, 0x04, 0x02, 0x00, 0x0D]),
            Apdu::from([0x00, 0xC0, 0x00, 0x00, 0x0D]),
        ];
        let text = send_command(&mut mock, "citizen_id", &command, ExchangeSettings::default()).unwrap();

        assert_eq!(text, "1103700012345");
        assert_eq!(mock.commands().len(), 2);
        assert_eq!(mock.commands()[1], vec![0x00, 0xC0, 0x00, 0x00, 0x0D]);
    }

    #[test]
    fn test_send_command_decodes_thai() {
        let mut mock = MockTransport::new();
        mock.queue_response(&[0xB9, 0xD2, 0xC2, b'#', 0x90, 0x00]);

        let text = send_command(&mut mock, "person_info", &[Apdu::from([0x00])], ExchangeSettings::default()).unwrap();
        assert_eq!(text, "นาย#");
    }

    #[test]
    fn test_send_command_propagates_transport_error() {
        let mut mock = MockTransport::new();
        mock.queue_response(&[0x61, 0x0D]);
        mock.queue_error("card removed");

        let command = vec![Apdu::from([0x01]), Apdu::from([0x02]), Apdu::from([0x03])];
        let err = send_command(&mut mock, "address", &command, ExchangeSettings::default()).unwrap_err();

        assert!(matches!(err, ReadError::Transport(TransportError::Transmit(ref m)) if m == "card removed"));
        // Nothing is sent after the failure.
        assert_eq!(mock.commands().len(), 2);
    }

    #[test]
    fn test_send_command_empty() {
        let mut mock = MockTransport::new();
        let err = send_command(&mut mock, "select", &[], ExchangeSettings::default()).unwrap_err();
        assert!(matches!(err, ReadError::EmptyCommand { name: "select" }));
    }
}
