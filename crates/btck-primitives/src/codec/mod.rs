//! Hex and Base64 codecs.
//!
//! Stateless byte<->text transforms used wherever entities cross the
//! engine boundary as strings instead of raw bytes.  Base58/Base58Check
//! lives in its own module.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::PrimitivesError;

/// Encode bytes as a lowercase hex string.
///
/// # Arguments
/// * `data` - The bytes to encode.
///
/// # Returns
/// A hex string of twice the input length.
pub fn hex_encode(data: &[u8]) -> String {
    hex::encode(data)
}

/// Decode a hex string into bytes.
///
/// # Arguments
/// * `s` - A hex string of even length.
///
/// # Returns
/// `Ok(Vec<u8>)` on success, or an error for odd length or non-hex
/// characters.
pub fn hex_decode(s: &str) -> Result<Vec<u8>, PrimitivesError> {
    hex::decode(s).map_err(|e| PrimitivesError::InvalidHex(e.to_string()))
}

/// Encode bytes as a standard RFC 4648 Base64 string (with padding).
///
/// # Arguments
/// * `data` - The bytes to encode.
///
/// # Returns
/// A Base64 string.
pub fn base64_encode(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// Decode a standard RFC 4648 Base64 string into bytes.
///
/// # Arguments
/// * `s` - The Base64 string to decode.
///
/// # Returns
/// `Ok(Vec<u8>)` on success, or an error for invalid characters or
/// incorrect padding.
pub fn base64_decode(s: &str) -> Result<Vec<u8>, PrimitivesError> {
    STANDARD
        .decode(s)
        .map_err(|e| PrimitivesError::InvalidBase64(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_roundtrip() {
        let data = vec![0x00, 0x01, 0xfe, 0xff];
        let encoded = hex_encode(&data);
        assert_eq!(encoded, "0001feff");
        assert_eq!(hex_decode(&encoded).unwrap(), data);
    }

    #[test]
    fn test_hex_decode_rejects_odd_length() {
        assert!(hex_decode("abc").is_err());
    }

    #[test]
    fn test_hex_decode_rejects_non_hex() {
        assert!(hex_decode("zz").is_err());
        assert!(hex_decode("0g").is_err());
    }

    #[test]
    fn test_base64_roundtrip() {
        let data = b"base64 test data".to_vec();
        let encoded = base64_encode(&data);
        assert_eq!(base64_decode(&encoded).unwrap(), data);
    }

    #[test]
    fn test_base64_known_vector() {
        // RFC 4648 test vector.
        assert_eq!(base64_encode(b"foobar"), "Zm9vYmFy");
        assert_eq!(base64_decode("Zm9vYmFy").unwrap(), b"foobar");
    }

    #[test]
    fn test_base64_decode_rejects_bad_input() {
        assert!(base64_decode("not base64!!").is_err());
        // Incorrect padding.
        assert!(base64_decode("Zm9vYmFy=").is_err());
    }

    #[test]
    fn test_base64_empty() {
        assert_eq!(base64_encode(b""), "");
        assert_eq!(base64_decode("").unwrap(), Vec::<u8>::new());
    }
}
