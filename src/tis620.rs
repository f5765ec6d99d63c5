//! TIS-620 payload decoding.
//!
//! Field offsets on the card are counted in bytes, so decoding must yield
//! exactly one `char` per byte. Bytes outside TIS-620 keep their Latin-1
//! code point instead of being dropped or replaced.

const THAI_OFFSET: u32 = 0x0E01 - 0xA1;

/// Decode a single byte.
pub fn decode_byte(byte: u8) -> char {
    match byte {
        0xA1..=0xDA | 0xDF..=0xFB => {
            char::from_u32(u32::from(byte) + THAI_OFFSET).unwrap_or(char::from(byte))
        }
        _ => char::from(byte),
    }
}

/// Decode a card payload to text, one character per byte.
pub fn decode(bytes: &[u8]) -> String {
    bytes.iter().copied().map(decode_byte).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii_passthrough() {
        assert_eq!(decode(b"Mr.#Somchai##Jaidee"), "Mr.#Somchai##Jaidee");
    }

    #[test]
    fn test_thai_block() {
        // นาย
        assert_eq!(decode(&[0xB9, 0xD2, 0xC2]), "นาย");
        assert_eq!(decode_byte(0xA1), 'ก');
        assert_eq!(decode_byte(0xDA), '\u{0E3A}');
        assert_eq!(decode_byte(0xDF), '\u{0E3F}');
        assert_eq!(decode_byte(0xFB), '\u{0E5B}');
    }

    #[test]
    fn test_one_char_per_byte() {
        let bytes: Vec<u8> = (0u8..=255).collect();
        assert_eq!(decode(&bytes).chars().count(), 256);
        assert_eq!(decode_byte(0x90), '\u{90}');
        assert_eq!(decode_byte(0xDB), '\u{DB}');
        assert_eq!(decode_byte(0xFF), '\u{FF}');
    }
}
