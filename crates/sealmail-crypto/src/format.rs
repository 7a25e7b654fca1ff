//! Shared encoding utilities.

use base64::Engine;

use crate::error::{CryptoError, CryptoResult};

/// Encode bytes as standard base64.
pub fn base64_encode(data: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(data)
}

/// Decode a standard base64 string to bytes.
pub fn base64_decode(data: &str) -> CryptoResult<Vec<u8>> {
    base64::engine::general_purpose::STANDARD
        .decode(data)
        .map_err(|e| CryptoError::InvalidFormat(format!("Invalid base64: {}", e)))
}

/// Decode base64 into a fixed-size array.
pub fn base64_decode_array<const N: usize>(data: &str, what: &str) -> CryptoResult<[u8; N]> {
    let bytes = base64_decode(data)?;
    bytes.try_into().map_err(|v: Vec<u8>| {
        CryptoError::InvalidFormat(format!("{}: expected {} bytes, got {}", what, N, v.len()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base64_decode_invalid() {
        let result = base64_decode("not valid base64!!!");
        assert!(matches!(result, Err(CryptoError::InvalidFormat(_))));
    }

    #[test]
    fn test_base64_decode_array_length_checked() {
        let encoded = base64_encode(&[7u8; 12]);
        let iv: [u8; 12] = base64_decode_array(&encoded, "iv").unwrap();
        assert_eq!(iv, [7u8; 12]);

        let err = base64_decode_array::<32>(&encoded, "key").unwrap_err();
        assert!(err.to_string().contains("expected 32 bytes, got 12"));
    }
}
