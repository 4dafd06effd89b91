//! Entry into the preview screen and exit to checkout

use log::{info, warn};

use crate::error::PreviewError;
use crate::pdf::EngineProvider;
use crate::preview::{PreviewConfig, Previewer};
use crate::session::{ProjectMetadata, SessionStore};

/// Screens the preview hands off to
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Route {
    /// Where the user uploads a document
    Upload,
    /// Where the order is placed
    Checkout,
}

impl Route {
    #[must_use]
    pub fn path(self) -> &'static str {
        match self {
            Route::Upload => "/design-project",
            Route::Checkout => "/shop",
        }
    }
}

/// Outcome of entering the preview
pub enum Entry {
    /// Nothing to preview; send the user elsewhere
    Redirect { route: Route, message: String },
    /// The document is loaded and the first spread is rendering
    Ready(PreviewSession),
}

/// An active preview
pub struct PreviewSession {
    pub previewer: Previewer,
    pub project: Option<ProjectMetadata>,
}

impl PreviewSession {
    /// Leave the preview for checkout. Allowed whatever the render state.
    #[must_use]
    pub fn submit(&self) -> Route {
        info!("Proceeding to checkout");
        Route::Checkout
    }
}

/// Enter the preview screen.
///
/// A missing document redirects to the upload step before the engine is
/// touched. Engine, decode and document failures are returned as errors.
pub fn enter_preview(
    store: &SessionStore,
    provider: &EngineProvider,
    config: PreviewConfig,
) -> Result<Entry, PreviewError> {
    let document = match store.stored_document() {
        Ok(document) => document,
        Err(PreviewError::MissingInput) => {
            warn!("No stored document, redirecting to {}", Route::Upload.path());
            return Ok(Entry::Redirect {
                route: Route::Upload,
                message: PreviewError::MissingInput.user_message(),
            });
        }
        Err(e) => return Err(e),
    };

    let project = store.project_metadata().unwrap_or_else(|e| {
        warn!("Ignoring stored project data: {e}");
        None
    });

    let mut previewer = Previewer::new(provider, config)?;
    previewer.load_data_url(document.data_url())?;

    Ok(Entry::Ready(PreviewSession { previewer, project }))
}
