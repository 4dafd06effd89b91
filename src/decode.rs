//! Data URL decoding
//!
//! The upload step stores documents as `data:<mime>;base64,<payload>`. The
//! payload is always treated as base64; the prefix is informational.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("data URL has no payload")]
    MissingPayload,

    #[error("data URL payload is not valid base64: {0}")]
    InvalidBase64(#[from] base64::DecodeError),
}

/// A data URL split into its prefix and payload
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DataUrl<'a> {
    /// Media type, e.g. `application/pdf`. Empty when the prefix omits it.
    pub mime: &'a str,
    /// Whether the prefix carries the `;base64` marker. Informational only:
    /// [`DataUrl::decode`] reads the payload as base64 either way.
    pub base64: bool,
    /// Encoded payload after the first comma
    pub payload: &'a str,
}

impl<'a> DataUrl<'a> {
    pub fn parse(input: &'a str) -> Result<Self, DecodeError> {
        let (meta, payload) = input.split_once(',').ok_or(DecodeError::MissingPayload)?;
        let meta = meta.trim();
        let meta = meta.strip_prefix("data:").unwrap_or(meta);
        let base64 = meta.ends_with(";base64");
        let mime = meta.split(';').next().unwrap_or_default();
        Ok(Self {
            mime,
            base64,
            payload,
        })
    }

    /// Decode the payload into raw bytes, as base64 whatever the prefix says
    pub fn decode(&self) -> Result<Vec<u8>, DecodeError> {
        // Line-wrapped payloads are common when the string went through a text file.
        let compact: String = self
            .payload
            .chars()
            .filter(|c| !c.is_ascii_whitespace())
            .collect();
        Ok(BASE64.decode(compact)?)
    }
}

/// Decode a `<prefix>,<base64>` string into the bytes it carries
pub fn decode_data_url(input: &str) -> Result<Vec<u8>, DecodeError> {
    DataUrl::parse(input)?.decode()
}

/// Inverse of [`decode_data_url`]
#[must_use]
pub fn encode_data_url(mime: &str, bytes: &[u8]) -> String {
    format!("data:{mime};base64,{}", BASE64.encode(bytes))
}
