//! Decoders for single event attribute values.
//!
//! All of these are pure and stateless. A decode failure is never fatal to
//! the surrounding parse: callers log the offending key/value and leave the
//! field at its zero value.

use thiserror::Error;

use crate::types::Height;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum AttributeError {
    #[error("malformed height attribute: {value}")]
    MalformedHeight { value: String },

    #[error("malformed hex attribute: {value}")]
    MalformedHex { value: String },

    #[error("malformed numeric attribute: {value}")]
    MalformedNumber { value: String },
}

/// Parse a `{revision_number}-{revision_height}` attribute value.
pub fn parse_height(value: &str) -> Result<Height, AttributeError> {
    let malformed = || AttributeError::MalformedHeight {
        value: value.to_string(),
    };

    let mut parts = value.split('-');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(revision), Some(height), None) => {
            let revision_number = revision.parse().map_err(|_| malformed())?;
            let revision_height = height.parse().map_err(|_| malformed())?;
            Ok(Height::new(revision_number, revision_height))
        }
        _ => Err(malformed()),
    }
}

/// Decode a hex-encoded byte payload.
///
/// Legacy plain-string byte fields (deprecated per the IBC spec, still
/// emitted by older chains) do not go through here: they are taken as UTF-8
/// bytes without decoding.
pub fn parse_hex(value: &str) -> Result<Vec<u8>, AttributeError> {
    hex::decode(value).map_err(|_| AttributeError::MalformedHex {
        value: value.to_string(),
    })
}

/// Parse an unsigned decimal attribute value (sequences, timestamps).
pub fn parse_number(value: &str) -> Result<u64, AttributeError> {
    value.parse().map_err(|_| AttributeError::MalformedNumber {
        value: value.to_string(),
    })
}
