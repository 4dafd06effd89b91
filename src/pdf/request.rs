//! Render request and response types

use std::sync::Arc;

use super::renderer::RenderError;
use super::types::RenderedPage;

/// Unique identifier for render requests
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RequestId(pub u64);

impl RequestId {
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }
}

/// Request sent to render workers
#[derive(Debug)]
pub enum RenderRequest {
    /// Render a page of the current document
    Page {
        id: RequestId,
        /// Spread generation the page belongs to
        generation: u64,
        /// Page number (1-indexed)
        page: usize,
        scale: f32,
    },

    /// Shutdown the worker
    Shutdown,
}

/// What became of a requested page
#[derive(Debug)]
pub enum PageOutcome {
    Rendered(Arc<RenderedPage>),
    /// The page number is outside the document
    OutOfRange,
    Failed(RenderError),
}

impl PageOutcome {
    /// The image to show, if any
    #[must_use]
    pub fn image(&self) -> Option<Arc<RenderedPage>> {
        match self {
            Self::Rendered(page) => Some(Arc::clone(page)),
            Self::OutOfRange | Self::Failed(_) => None,
        }
    }
}

/// Response from render workers
#[derive(Debug)]
pub struct RenderResponse {
    pub id: RequestId,
    pub generation: u64,
    pub page: usize,
    pub outcome: PageOutcome,
}
