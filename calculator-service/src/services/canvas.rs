//! Decoding of the data-URI canvas snapshots sent by the web client.

use base64::{
    alphabet,
    engine::{GeneralPurpose, GeneralPurposeConfig},
    Engine as _,
};
use std::fmt::Debug;
use thiserror::Error;

/// MIME type assumed when the data-URI prefix does not name one.
pub const DEFAULT_MIME_TYPE: &str = "image/png";

/// Standard alphabet with required padding. Non-zero trailing bits in the last
/// symbol are tolerated.
const PAYLOAD_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_allow_trailing_bits(true),
);

#[derive(Error, Debug)]
pub enum CanvasError {
    #[error("image is not a data URI: expected ',' between the metadata and the base64 payload")]
    MissingSeparator,

    #[error("invalid base64 payload: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    #[error("image payload is empty")]
    EmptyImage,
}

/// Raw image bytes decoded from a data URI. Pixels are not decoded here.
#[derive(Clone, PartialEq, Eq)]
pub struct CanvasImage {
    bytes: Vec<u8>,
    mime_type: String,
}

impl CanvasImage {
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes,
            mime_type: mime_type.into(),
        }
    }

    /// Parse `data:<mime>;base64,<payload>`. Everything before the first comma
    /// is metadata; whitespace inside the payload is ignored.
    pub fn from_data_uri(uri: &str) -> Result<Self, CanvasError> {
        let (metadata, payload) = uri.split_once(',').ok_or(CanvasError::MissingSeparator)?;

        let payload: String = payload
            .chars()
            .filter(|c| !c.is_ascii_whitespace())
            .collect();
        let bytes = PAYLOAD_ENGINE.decode(payload)?;
        if bytes.is_empty() {
            return Err(CanvasError::EmptyImage);
        }

        Ok(Self::new(bytes, mime_type_of(metadata)))
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl Debug for CanvasImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "CanvasImage {{ bytes: <{} bytes>, mime_type: {:?} }}",
            self.bytes.len(),
            self.mime_type
        )
    }
}

fn mime_type_of(metadata: &str) -> &str {
    metadata
        .strip_prefix("data:")
        .and_then(|rest| rest.split(';').next())
        .map(str::trim)
        .filter(|mime| !mime.is_empty())
        .unwrap_or(DEFAULT_MIME_TYPE)
}
