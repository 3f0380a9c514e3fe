//! JSON codec for the capability surface.
//!
//! Encoding and decoding never throw across the module boundary: malformed
//! input and unencodable values surface as [`CapabilityError::Parse`].

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::Result;

/// Encode a value as JSON text.
pub fn serialize<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}

/// Decode JSON text into a value.
pub fn deserialize<T: DeserializeOwned>(text: &str) -> Result<T> {
    Ok(serde_json::from_str(text)?)
}
