//! APDU command catalog.
//!
//! A logical read is a list of APDUs sent in order; only the response to the
//! last one carries data. The photo is read as a list of
//! (set-pointer, read-chunk) pairs.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Raw APDU bytes. Serialized as an uppercase hex string.
#[derive(Clone, PartialEq, Eq)]
pub struct Apdu(pub Vec<u8>);

impl Apdu {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<&[u8]> for Apdu {
    fn from(bytes: &[u8]) -> Self {
        Apdu(bytes.to_vec())
    }
}

impl<const N: usize> From<[u8; N]> for Apdu {
    fn from(bytes: [u8; N]) -> Self {
        Apdu(bytes.to_vec())
    }
}

impl fmt::Debug for Apdu {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Apdu({})", hex::encode_upper(&self.0))
    }
}

impl Serialize for Apdu {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode_upper(&self.0))
    }
}

impl<'de> Deserialize<'de> for Apdu {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
        hex::decode(&compact).map(Apdu).map_err(D::Error::custom)
    }
}

/// One photo chunk: move the read pointer, then fetch the chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoChunkCommand {
    pub pointer: Apdu,
    pub read: Apdu,
}

/// Every command a read session sends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandCatalog {
    pub select: Vec<Apdu>,
    pub citizen_id: Vec<Apdu>,
    pub person_info: Vec<Apdu>,
    pub address: Vec<Apdu>,
    pub issue_expire: Vec<Apdu>,
    pub photo: Vec<PhotoChunkCommand>,
}

/// Thai ID applet AID.
pub const THAI_ID_AID: [u8; 8] = [0xA0, 0x00, 0x00, 0x00, 0x54, 0x48, 0x00, 0x01];

/// Photo chunks on the card.
pub const PHOTO_CHUNKS: usize = 20;
/// Card offset of the first photo chunk.
pub const PHOTO_START: u16 = 0x017B;
/// Bytes per photo chunk.
pub const PHOTO_CHUNK_LEN: u8 = 0xFF;

/// READ BINARY at a card offset.
fn read_binary(offset: u16, len: u8) -> Apdu {
    let [hi, lo] = offset.to_be_bytes();
    Apdu::from([0x80, 0xB0, hi, lo, 0x02, 0x00, len])
}

/// GET RESPONSE for the data prepared by the preceding command.
fn get_response(len: u8) -> Apdu {
    Apdu::from([0x00, 0xC0, 0x00, 0x00, len])
}

fn read_field(offset: u16, len: u8) -> Vec<Apdu> {
    vec![read_binary(offset, len), get_response(len)]
}

impl CommandCatalog {
    /// The Thai national ID card layout.
    pub fn thai_id() -> Self {
        let mut select = vec![0x00, 0xA4, 0x04, 0x00, THAI_ID_AID.len() as u8];
        select.extend_from_slice(&THAI_ID_AID);

        let photo = (0..PHOTO_CHUNKS)
            .map(|i| {
                let offset = PHOTO_START + (i as u16) * u16::from(PHOTO_CHUNK_LEN);
                PhotoChunkCommand {
                    pointer: read_binary(offset, PHOTO_CHUNK_LEN),
                    read: get_response(PHOTO_CHUNK_LEN),
                }
            })
            .collect();

        Self {
            select: vec![Apdu(select)],
            citizen_id: read_field(0x0004, 0x0D),
            person_info: read_field(0x0011, 0xD1),
            address: read_field(0x1579, 0x64),
            issue_expire: read_field(0x0167, 0x12),
            photo,
        }
    }

    /// Named commands in session order, for validation and logging.
    pub fn commands(&self) -> [(&'static str, &[Apdu]); 5] {
        [
            ("select", self.select.as_slice()),
            ("citizen_id", self.citizen_id.as_slice()),
            ("person_info", self.person_info.as_slice()),
            ("address", self.address.as_slice()),
            ("issue_expire", self.issue_expire.as_slice()),
        ]
    }
}

impl Default for CommandCatalog {
    fn default() -> Self {
        Self::thai_id()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thai_id_select() {
        let catalog = CommandCatalog::thai_id();
        assert_eq!(
            catalog.select[0].as_bytes(),
            &[0x00, 0xA4, 0x04, 0x00, 0x08, 0xA0, 0x00, 0x00, 0x00, 0x54, 0x48, 0x00, 0x01]
        );
    }

    #[test]
    fn test_thai_id_reads() {
        let catalog = CommandCatalog::thai_id();
        assert_eq!(
            catalog.person_info,
            vec![
                Apdu::from([0x80, 0xB0, 0x00, 0x11, 0x02, 0x00, 0xD1]),
                Apdu::from([0x00, 0xC0, 0x00, 0x00, 0xD1]),
            ]
        );
        assert_eq!(
            catalog.address[0].as_bytes(),
            &[0x80, 0xB0, 0x15, 0x79, 0x02, 0x00, 0x64]
        );
    }

    #[test]
    fn test_photo_offsets() {
        let catalog = CommandCatalog::thai_id();
        assert_eq!(catalog.photo.len(), PHOTO_CHUNKS);
        assert_eq!(
            catalog.photo[0].pointer.as_bytes(),
            &[0x80, 0xB0, 0x01, 0x7B, 0x02, 0x00, 0xFF]
        );
        assert_eq!(
            catalog.photo[1].pointer.as_bytes(),
            &[0x80, 0xB0, 0x02, 0x7A, 0x02, 0x00, 0xFF]
        );
        assert_eq!(
            catalog.photo[19].pointer.as_bytes(),
            &[0x80, 0xB0, 0x14, 0x68, 0x02, 0x00, 0xFF]
        );
        assert_eq!(
            catalog.photo[19].read.as_bytes(),
            &[0x00, 0xC0, 0x00, 0x00, 0xFF]
        );
    }

    #[test]
    fn test_apdu_hex_serde() {
        let apdu: Apdu = serde_json::from_str("\"00 C0 00 00 0d\"").unwrap();
        assert_eq!(apdu.as_bytes(), &[0x00, 0xC0, 0x00, 0x00, 0x0D]);
        assert_eq!(serde_json::to_string(&apdu).unwrap(), "\"00C000000D\"");
        assert!(serde_json::from_str::<Apdu>("\"0G\"").is_err());
    }
}
