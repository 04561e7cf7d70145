use bitstream_io::{BigEndian, BitWrite, BitWriter};
use std::io;
use thiserror::Error;

/// The error type that describes failures to decode Base64 encoded segments.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum DecodeError {
    /// An invalid byte was found in the input. The offset and offending byte are provided.
    #[error("invalid byte {byte:#04x} at offset {offset}")]
    InvalidCharacter { offset: usize, byte: u8 },
    #[error("unable to write decoded bits: {0}")]
    Write(#[from] io::Error),
}

/// Base64 decoding using the URL Safe dictionary, 6-bits aligned.
///
/// Consent string segments are bit strings which do not always end on a byte boundary,
/// so the last partial byte is padded with zeroes rather than rejected.
/// Trailing `=` padding characters are ignored.
pub fn decode(s: &str) -> Result<Vec<u8>, DecodeError> {
    let s = s.trim_end_matches('=');

    // output is never larger than the input, pre-allocate to avoid reallocations
    let mut buffer = Vec::with_capacity(s.len());
    {
        let mut bw = BitWriter::endian(&mut buffer, BigEndian);

        for (offset, byte) in s.bytes().enumerate() {
            let value =
                base64_value(byte).ok_or(DecodeError::InvalidCharacter { offset, byte })?;
            bw.write_unsigned::<6, u8>(value)?;
        }

        // pad the last byte with zeroes if we're not 8-bit aligned at this point
        bw.byte_align()?;
    }

    Ok(buffer)
}

fn base64_value(b: u8) -> Option<u8> {
    match b {
        b'A'..=b'Z' => Some(b - b'A'),
        b'a'..=b'z' => Some(b - b'a' + 26),
        b'0'..=b'9' => Some(b - b'0' + 52),
        b'-' => Some(62),
        b'_' => Some(63),
        _ => None,
    }
}
