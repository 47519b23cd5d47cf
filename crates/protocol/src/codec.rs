//! Base64 encoding of byte ranges.

use base64::{Engine, engine::general_purpose::STANDARD};

/// Encodes bytes as standard (padded) base64.
pub fn encode(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// Decodes standard base64 into bytes.
///
/// Surrounding whitespace is ignored; some remote layers append a newline.
pub fn decode(data: &str) -> Result<Vec<u8>, base64::DecodeError> {
    STANDARD.decode(data.trim())
}
