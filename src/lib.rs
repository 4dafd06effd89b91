// Export modules for use in tests
pub mod decode;
pub mod error;
pub mod panic_handler;
pub mod pdf;
pub mod preview;
pub mod session;
pub mod settings;
pub mod shell;
pub mod workflow;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use error::PreviewError;
pub use pdf::{EngineProvider, PageWindow, RenderedPage, RenderedSpread};
pub use preview::{Navigation, PreviewConfig, Previewer};
pub use workflow::{Entry, PreviewSession, Route, enter_preview};
