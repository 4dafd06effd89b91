//! Error taxonomy for the preview workflow

use std::time::Duration;

use crate::decode::DecodeError;
use crate::pdf::{EngineFault, RenderError};

/// Errors surfaced by the preview workflow
#[derive(Debug, thiserror::Error)]
pub enum PreviewError {
    /// Nothing was stored by the upload step
    #[error("no document stored for preview")]
    MissingInput,

    /// The rendering engine could not be obtained
    #[error("rendering engine failed to initialize: {0}")]
    EngineInit(#[source] EngineFault),

    /// The stored bytes are not a document the engine understands
    #[error("malformed document: {0}")]
    MalformedDocument(#[source] EngineFault),

    /// A single page failed to rasterize
    #[error("failed to render {0}")]
    Render(#[from] RenderError),

    /// The stored data URL is corrupt
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// The session store could not be read or written
    #[error("session store: {0}")]
    Session(#[source] anyhow::Error),

    /// The configured zoom cannot produce a page image
    #[error("invalid render scale {0}")]
    InvalidScale(f32),

    /// A spread did not settle in time
    #[error("timed out after {0:?} waiting for pages to render")]
    Timeout(Duration),
}

impl PreviewError {
    /// Whether the user can get out of this state without restarting the preview.
    ///
    /// Missing input redirects to the upload step and per-page failures
    /// degrade to a placeholder. Everything else ends the preview.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::MissingInput | Self::Render(_))
    }

    /// Text shown to the user for this failure
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::MissingInput => {
                "No PDF file found for preview. Please upload a file first.".to_string()
            }
            Self::EngineInit(_) => "PDF processor failed to initialize.".to_string(),
            Self::MalformedDocument(_) | Self::Decode(_) => {
                "Failed to load the PDF preview. Please try again.".to_string()
            }
            Self::Render(err) => format!("Page {} is unavailable.", err.page),
            Self::Session(_) => {
                "Failed to read the stored preview. Please upload your file again.".to_string()
            }
            Self::InvalidScale(scale) => {
                format!("Invalid preview scale {scale}. Use a positive number.")
            }
            Self::Timeout(_) => "The preview is taking too long. Please try again.".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_missing_input_and_render_are_recoverable() {
        assert!(PreviewError::MissingInput.is_recoverable());
        assert!(
            PreviewError::Render(RenderError {
                page: 3,
                source: EngineFault::generic("bad page"),
            })
            .is_recoverable()
        );
        assert!(!PreviewError::EngineInit(EngineFault::generic("no asset")).is_recoverable());
        assert!(!PreviewError::MalformedDocument(EngineFault::generic("junk")).is_recoverable());
        assert!(!PreviewError::Decode(DecodeError::MissingPayload).is_recoverable());
    }

    #[test]
    fn messages_name_the_failure() {
        assert_eq!(
            PreviewError::EngineInit(EngineFault::generic("x")).user_message(),
            "PDF processor failed to initialize."
        );
        assert_eq!(
            PreviewError::Render(RenderError {
                page: 7,
                source: EngineFault::generic("x"),
            })
            .user_message(),
            "Page 7 is unavailable."
        );
    }
}
