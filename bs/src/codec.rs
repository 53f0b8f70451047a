//! Printable text codec for binary strings
//!
//! A binary string is cut into `chunk_size`-bit groups, each group becomes one
//! small integer, and every integer is written as a single character after a
//! +42 shift. The four reserved code points (NUL, LF, CR and `=`) never appear
//! as data: they are written as `=` followed by the shifted value plus 64, the
//! same byte-stuffing yEnc uses.
//!
//! The persisted text starts with one decimal digit holding the bit width of a
//! short final chunk, `0` when the last chunk is full:
//!
//! ```text
//! "00000001"  --chunk 7-->  [0b0000000, 0b1]  -->  "1" + "*" + "+"  ==  "1*+"
//! ```

use thiserror::Error;

use crate::bits::find_non_binary;

/// Widest chunk the codec accepts; one chunk must fit in a byte
pub const MAX_CHUNK_SIZE: u8 = 8;

const SHIFT: u8 = 42;
const ESCAPE: char = '=';
const ESCAPE_OFFSET: u8 = 64;
const RESERVED: [u8; 4] = [0, 10, 13, 61];

/// Errors raised while converting between binary strings and persisted text
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("Chunk size {0} out of range (1..={MAX_CHUNK_SIZE})")]
    ChunkSize(u8),

    #[error("Not binary data: {ch:?} at position {position}")]
    NotBinary { position: usize, ch: char },

    #[error("Character {ch:?} at position {position} is outside the encoded range")]
    CharOutOfRange { position: usize, ch: char },

    #[error("Encoded text is empty, missing overflow digit")]
    MissingOverflow,

    #[error("Invalid overflow digit {ch:?} for chunk size {chunk_size}")]
    InvalidOverflow { ch: char, chunk_size: u8 },

    #[error("Decoded value {value} does not fit in {width} bits")]
    ValueTooWide { value: u8, width: u8 },

    #[error("Decoded {actual} bits, expected {expected}")]
    LengthMismatch { expected: usize, actual: usize },
}

/// Encode a sequence of small integers as byte-stuffed text
pub fn encode(values: &[u8]) -> String {
    let mut out = String::with_capacity(values.len());
    for &value in values {
        let shifted = value.wrapping_add(SHIFT);
        if RESERVED.contains(&shifted) {
            out.push(ESCAPE);
            out.push(char::from(shifted.wrapping_add(ESCAPE_OFFSET)));
        } else {
            out.push(char::from(shifted));
        }
    }
    out
}

/// Decode byte-stuffed text back into integers
///
/// CR and LF are skipped wherever they appear. A lone trailing `=` yields
/// nothing. Code points above U+00FF are never produced by [`encode`] and are
/// rejected with [`CodecError::CharOutOfRange`].
pub fn decode(text: &str) -> Result<Vec<u8>, CodecError> {
    let mut out = Vec::with_capacity(text.len());
    let mut escaped = false;
    for (position, ch) in text.chars().enumerate() {
        if ch == '\r' || ch == '\n' {
            continue;
        }
        if ch == ESCAPE && !escaped {
            escaped = true;
            continue;
        }
        let mut code = u8::try_from(u32::from(ch)).map_err(|_| CodecError::CharOutOfRange { position, ch })?;
        if escaped {
            escaped = false;
            code = code.wrapping_sub(ESCAPE_OFFSET);
        }
        // Values that wrapped past 255 on encode land in 0..42
        out.push(code.wrapping_sub(SHIFT));
    }
    Ok(out)
}

/// Chunked codec bound to a fixed chunk width
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Codec {
    chunk_size: u8,
}

impl Codec {
    /// Create a codec for `chunk_size`-bit chunks (1..=8)
    pub fn new(chunk_size: u8) -> Result<Self, CodecError> {
        if chunk_size == 0 || chunk_size > MAX_CHUNK_SIZE {
            return Err(CodecError::ChunkSize(chunk_size));
        }
        Ok(Self { chunk_size })
    }

    pub fn chunk_size(&self) -> u8 {
        self.chunk_size
    }

    /// Convert a binary string into persisted text
    pub fn binary_to_text(&self, binary: &str) -> Result<String, CodecError> {
        if let Some((position, ch)) = find_non_binary(binary) {
            return Err(CodecError::NotBinary { position, ch });
        }

        let width = usize::from(self.chunk_size);
        let values: Vec<u8> = binary.as_bytes().chunks(width).map(parse_chunk).collect();

        // overflow < chunk_size <= 8, always a single digit
        let overflow = (binary.len() % width) as u8;
        let mut out = String::with_capacity(values.len() + 1);
        out.push(char::from(b'0' + overflow));
        out.push_str(&encode(&values));
        Ok(out)
    }

    /// Convert persisted text back into the binary string it was made from
    pub fn text_to_binary(&self, text: &str) -> Result<String, CodecError> {
        let mut chars = text.chars();
        let lead = chars.next().ok_or(CodecError::MissingOverflow)?;
        let overflow = lead
            .to_digit(10)
            .filter(|digit| *digit < u32::from(self.chunk_size))
            .ok_or(CodecError::InvalidOverflow {
                ch: lead,
                chunk_size: self.chunk_size,
            })? as u8;

        // positions reported relative to the full text, overflow digit included
        let values = decode(chars.as_str()).map_err(|e| match e {
            CodecError::CharOutOfRange { position, ch } => CodecError::CharOutOfRange {
                position: position + 1,
                ch,
            },
            other => other,
        })?;
        let last = values.len().saturating_sub(1);
        let mut binary = String::with_capacity(values.len() * usize::from(self.chunk_size));

        for (i, &value) in values.iter().enumerate() {
            let width = if i == last && overflow > 0 {
                overflow
            } else {
                self.chunk_size
            };
            if width < 8 && value >> width != 0 {
                return Err(CodecError::ValueTooWide { value, width });
            }
            binary.push_str(&format!("{:0width$b}", value, width = usize::from(width)));
        }

        Ok(binary)
    }
}

fn parse_chunk(chunk: &[u8]) -> u8 {
    chunk.iter().fold(0u8, |acc, bit| (acc << 1) | (bit - b'0'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_encode_plain_values() {
        assert_eq!(encode(&[0, 1, 2]), "*+,");
        assert_eq!(encode(&[85]), "\u{7f}");
    }

    #[test]
    fn test_encode_escapes_reserved() {
        // 19 + 42 == '='
        assert_eq!(encode(&[19]), "=}");
        // 214 + 42 wraps to NUL
        assert_eq!(encode(&[214]), "=@");
        // wraps to LF and CR
        assert_eq!(encode(&[224]), "=J");
        assert_eq!(encode(&[227]), "=M");
    }

    #[test]
    fn test_encode_wrapped_not_reserved() {
        assert_eq!(encode(&[255]), "\u{29}");
        assert_eq!(encode(&[232]), "\u{12}");
    }

    #[test]
    fn test_decode_skips_newlines() {
        assert_eq!(decode("*\r\n+"), Ok(vec![0, 1]));
        // newline between escape marker and escaped char
        assert_eq!(decode("=\n}"), Ok(vec![19]));
    }

    #[test]
    fn test_decode_wrapped_values() {
        assert_eq!(decode("=@"), Ok(vec![214]));
        assert_eq!(decode("\u{29}"), Ok(vec![255]));
        assert_eq!(decode("=J=M"), Ok(vec![224, 227]));
    }

    #[test]
    fn test_decode_trailing_escape() {
        assert_eq!(decode("*="), Ok(vec![0]));
    }

    #[test]
    fn test_decode_rejects_wide_chars() {
        // U+012A would alias '*' (value 0) if folded into a byte
        assert_eq!(
            decode("*\u{12a}"),
            Err(CodecError::CharOutOfRange { position: 1, ch: '\u{12a}' })
        );
        assert_eq!(
            decode("=\u{140}"),
            Err(CodecError::CharOutOfRange { position: 1, ch: '\u{140}' })
        );
        assert!(decode("\u{ff}").is_ok());
    }

    #[test]
    fn test_text_to_binary_rejects_wide_chars() {
        let codec = Codec::new(7).unwrap();
        assert_eq!(
            codec.text_to_binary("1*\u{12a}"),
            Err(CodecError::CharOutOfRange { position: 2, ch: '\u{12a}' })
        );
    }

    #[test]
    fn test_codec_rejects_chunk_size() {
        assert_eq!(Codec::new(0), Err(CodecError::ChunkSize(0)));
        assert_eq!(Codec::new(9), Err(CodecError::ChunkSize(9)));
        assert!(Codec::new(8).is_ok());
    }

    #[test]
    fn test_binary_to_text_overflow_digit() {
        let codec = Codec::new(7).unwrap();
        assert_eq!(codec.binary_to_text("").unwrap(), "0");
        assert_eq!(codec.binary_to_text("10").unwrap(), "2,");
        assert_eq!(codec.binary_to_text("0000000").unwrap(), "0*");
        assert_eq!(codec.binary_to_text("00000001").unwrap(), "1*+");
    }

    #[test]
    fn test_binary_to_text_rejects_non_binary() {
        let codec = Codec::new(7).unwrap();
        assert_eq!(
            codec.binary_to_text("0120"),
            Err(CodecError::NotBinary { position: 2, ch: '2' })
        );
    }

    #[test]
    fn test_text_to_binary_pads_chunks() {
        let codec = Codec::new(7).unwrap();
        assert_eq!(codec.text_to_binary("1*+").unwrap(), "00000001");
        assert_eq!(codec.text_to_binary("2,").unwrap(), "10");
        assert_eq!(codec.text_to_binary("0").unwrap(), "");
    }

    #[test]
    fn test_text_to_binary_errors() {
        let codec = Codec::new(4).unwrap();
        assert_eq!(codec.text_to_binary(""), Err(CodecError::MissingOverflow));
        assert_eq!(
            codec.text_to_binary("x*"),
            Err(CodecError::InvalidOverflow { ch: 'x', chunk_size: 4 })
        );
        assert_eq!(
            codec.text_to_binary("4*"),
            Err(CodecError::InvalidOverflow { ch: '4', chunk_size: 4 })
        );
        // 20 does not fit in a 4-bit chunk
        assert_eq!(
            codec.text_to_binary("0>"),
            Err(CodecError::ValueTooWide { value: 20, width: 4 })
        );
    }

    #[test]
    fn test_full_byte_chunks() {
        let codec = Codec::new(8).unwrap();
        let bits = "11010110";
        let text = codec.binary_to_text(bits).unwrap();
        assert_eq!(text, "0=@");
        assert_eq!(codec.text_to_binary(&text).unwrap(), bits);
    }

    proptest! {
        #[test]
        fn prop_binary_round_trip(bits in "[01]{0,500}", chunk_size in 1u8..=8) {
            let codec = Codec::new(chunk_size).unwrap();
            let text = codec.binary_to_text(&bits).unwrap();
            prop_assert_eq!(codec.text_to_binary(&text).unwrap(), bits);
        }

        #[test]
        fn prop_decode_inverts_encode(
            chunk_size in 1u8..=8,
            raw in proptest::collection::vec(any::<u8>(), 0..200),
        ) {
            let values: Vec<u8> = raw
                .into_iter()
                .map(|v| if chunk_size == 8 { v } else { v % (1 << chunk_size) })
                .collect();
            prop_assert_eq!(decode(&encode(&values)), Ok(values));
        }

        #[test]
        fn prop_encoded_text_has_no_reserved(values in proptest::collection::vec(any::<u8>(), 0..200)) {
            let text = encode(&values);
            prop_assert!(!text.contains(['\0', '\n', '\r']));
        }
    }
}
