//! PDF spread rendering infrastructure

mod cache;
mod engine;
#[cfg(feature = "pdf")]
mod mupdf_backend;
mod renderer;
mod request;
mod service;
mod state;
mod types;
mod worker;

pub use cache::{CacheKey, PageCache};
pub use engine::{DocumentHandle, EngineFault, EngineProvider, PageSource, RenderEngine};
#[cfg(feature = "pdf")]
pub use mupdf_backend::MupdfEngine;
pub use renderer::{PageRenderer, RenderError, is_valid_scale};
pub use request::{PageOutcome, RenderRequest, RenderResponse, RequestId};
pub use service::RenderService;
pub use state::{Command, Effect, PendingSpread, SpreadState};
pub use types::*;

/// Zoom applied to every page
pub const DEFAULT_SCALE: f32 = 1.5;
/// Render threads per document
pub const DEFAULT_WORKERS: usize = 2;
/// Rendered pages kept per document
pub const DEFAULT_CACHE_SIZE: usize = 16;
/// Longest side of a rendered page in pixels
pub const DEFAULT_MAX_DIMENSION: u32 = 4096;
