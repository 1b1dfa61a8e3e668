use base64::Engine as _;
use tm_model::PayloadEncoding;

use crate::error::DecodeError;

/// Converts a raw frame's bytes to the declared wire encoding before
/// handing them to the decoder script. `PlainText`/`Binary` are
/// pass-through; `Hexadecimal`/`Base64` are unpacked to their underlying
/// bytes.
pub fn decode_payload(encoding: PayloadEncoding, raw: &[u8]) -> Result<Vec<u8>, DecodeError> {
    match encoding {
        PayloadEncoding::PlainText | PayloadEncoding::Binary => Ok(raw.to_vec()),
        PayloadEncoding::Hexadecimal => decode_hex(raw),
        PayloadEncoding::Base64 => {
            base64::engine::general_purpose::STANDARD.decode(raw).map_err(DecodeError::InvalidBase64)
        }
    }
}

fn decode_hex(raw: &[u8]) -> Result<Vec<u8>, DecodeError> {
    let text = std::str::from_utf8(raw).map_err(|_| DecodeError::InvalidUtf8)?;
    let text = text.trim();
    if text.len() % 2 != 0 {
        return Err(DecodeError::InvalidHex(text.to_string()));
    }
    let mut out = Vec::with_capacity(text.len() / 2);
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        let hi = hex_digit(bytes[i]).ok_or_else(|| DecodeError::InvalidHex(text.to_string()))?;
        let lo = hex_digit(bytes[i + 1]).ok_or_else(|| DecodeError::InvalidHex(text.to_string()))?;
        out.push((hi << 4) | lo);
        i += 2;
    }
    Ok(out)
}

fn hex_digit(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_round_trip() {
        let decoded = decode_payload(PayloadEncoding::Hexadecimal, b"48656c6c6f").unwrap();
        assert_eq!(decoded, b"Hello");
    }

    #[test]
    fn base64_round_trip() {
        let decoded = decode_payload(PayloadEncoding::Base64, b"SGVsbG8=").unwrap();
        assert_eq!(decoded, b"Hello");
    }

    #[test]
    fn plaintext_passes_through() {
        let decoded = decode_payload(PayloadEncoding::PlainText, b"Hello").unwrap();
        assert_eq!(decoded, b"Hello");
    }

    #[test]
    fn odd_length_hex_is_rejected() {
        assert!(decode_payload(PayloadEncoding::Hexadecimal, b"abc").is_err());
    }
}
