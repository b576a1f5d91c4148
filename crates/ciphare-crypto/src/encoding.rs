//! Wire encoding for binary fields (ciphertext, nonce, salt, tag, payloads)
//!
//! Standard base64 with padding. Decoding tolerates missing padding since
//! some clients strip it, but anything still malformed after re-padding is
//! rejected.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::CryptoError;

pub fn encode(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// Decode standard base64, re-adding `=` padding up to a multiple of 4.
pub fn decode(s: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let trimmed = s.trim();
    let rem = trimmed.len() % 4;
    if rem == 0 {
        return STANDARD.decode(trimmed);
    }
    let mut padded = String::with_capacity(trimmed.len() + 4 - rem);
    padded.push_str(trimmed);
    for _ in rem..4 {
        padded.push('=');
    }
    STANDARD.decode(padded)
}

/// Decode a stored auxiliary field, reporting failures as malformed metadata.
pub fn decode_field(name: &str, s: &str) -> Result<Vec<u8>, CryptoError> {
    decode(s).map_err(|e| CryptoError::MalformedMetadata(format!("{name}: {e}")))
}
