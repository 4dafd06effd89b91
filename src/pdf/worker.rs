//! Render worker - runs in separate thread(s)

use std::sync::{Arc, Mutex, PoisonError};

use flume::{Receiver, Sender};
use log::{debug, error, warn};

use super::cache::{CacheKey, PageCache};
use super::engine::{DocumentHandle, EngineFault, RenderEngine};
use super::renderer::{PageRenderer, RenderError};
use super::request::{PageOutcome, RenderRequest, RenderResponse, RequestId};

/// Everything a worker needs besides its channels
pub struct WorkerContext {
    pub engine: Arc<dyn RenderEngine>,
    pub document: DocumentHandle,
    pub max_dimension: u32,
    pub cache: Arc<Mutex<PageCache>>,
}

/// Main worker function - runs in a dedicated thread
#[expect(
    clippy::needless_pass_by_value,
    reason = "Values moved into thread, need ownership"
)]
pub fn render_worker(
    ctx: WorkerContext,
    requests: Receiver<RenderRequest>,
    responses: Sender<RenderResponse>,
) {
    // Documents are opened per thread; engine documents are not shareable.
    let renderer = match PageRenderer::open(ctx.engine.as_ref(), &ctx.document, ctx.max_dimension)
    {
        Ok(r) => Some(r),
        Err(e) => {
            error!("Render worker could not open document: {e}");
            None
        }
    };

    for request in requests {
        match request {
            RenderRequest::Page {
                id,
                generation,
                page,
                scale,
            } => {
                let outcome = match renderer.as_ref() {
                    Some(renderer) => render_page(renderer, &ctx.cache, page, scale),
                    None => PageOutcome::Failed(RenderError {
                        page,
                        source: EngineFault::generic("document could not be opened by worker"),
                    }),
                };
                send(&responses, id, generation, page, outcome);
            }

            RenderRequest::Shutdown => break,
        }
    }
    debug!("Render worker exiting");
}

fn render_page(
    renderer: &PageRenderer,
    cache: &Mutex<PageCache>,
    page: usize,
    scale: f32,
) -> PageOutcome {
    let key = CacheKey::new(page, scale);

    let cached = cache.lock().unwrap_or_else(PoisonError::into_inner).get(&key);
    if let Some(cached) = cached {
        return PageOutcome::Rendered(cached);
    }

    match renderer.render(page, scale) {
        Ok(Some(rendered)) => {
            let cached = cache
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(key, rendered);
            PageOutcome::Rendered(cached)
        }
        Ok(None) => PageOutcome::OutOfRange,
        Err(e) => {
            warn!("Failed to render {e}");
            PageOutcome::Failed(e)
        }
    }
}

fn send(
    responses: &Sender<RenderResponse>,
    id: RequestId,
    generation: u64,
    page: usize,
    outcome: PageOutcome,
) {
    let response = RenderResponse {
        id,
        generation,
        page,
        outcome,
    };
    if responses.send(response).is_err() {
        debug!("Response for page {page} dropped, service is gone");
    }
}
