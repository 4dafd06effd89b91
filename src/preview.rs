//! Two-page spread previewer
//!
//! Drives [`SpreadState`] and the render pool for one preview session. A
//! navigation renders both pages of the target window and swaps the visible
//! window and images together once both have settled.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use log::{debug, error, info, warn};

use crate::decode::decode_data_url;
use crate::error::PreviewError;
use crate::pdf::{
    Command, DEFAULT_CACHE_SIZE, DEFAULT_MAX_DIMENSION, DEFAULT_SCALE, DEFAULT_WORKERS,
    DocumentHandle, Effect, EngineProvider, PageCache, PageOutcome, PageWindow, PendingSpread,
    RenderEngine, RenderResponse, RenderService, RenderedSpread, SpreadState, is_valid_scale,
};

/// Tunables for a preview session
#[derive(Clone, Debug, PartialEq)]
pub struct PreviewConfig {
    pub scale: f32,
    pub workers: usize,
    pub cache_size: usize,
    pub max_dimension: u32,
    pub render_timeout: Duration,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            scale: DEFAULT_SCALE,
            workers: DEFAULT_WORKERS,
            cache_size: DEFAULT_CACHE_SIZE,
            max_dimension: DEFAULT_MAX_DIMENSION,
            render_timeout: Duration::from_secs(30),
        }
    }
}

/// Result of a navigation request
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Navigation {
    /// Rendering of this window has started
    Started(PageWindow),
    /// Already at the boundary, or no document loaded
    Ignored,
    /// Another spread is still rendering; try again after it commits
    Busy,
}

/// Pagination controller for one preview session
pub struct Previewer {
    engine: Arc<dyn RenderEngine>,
    config: PreviewConfig,
    state: SpreadState,
    spread: RenderedSpread,
    committed: bool,
    document: Option<DocumentHandle>,
    service: Option<RenderService>,
    pending: Option<PendingSpread>,
    generation: u64,
    page_errors: Vec<PreviewError>,
    cache: Arc<Mutex<PageCache>>,
}

impl Previewer {
    /// Initialize the engine (once per provider) and create an empty previewer.
    ///
    /// A scale that cannot produce page images is refused up front.
    pub fn new(provider: &EngineProvider, config: PreviewConfig) -> Result<Self, PreviewError> {
        if !is_valid_scale(config.scale) {
            error!("Refusing render scale {}", config.scale);
            return Err(PreviewError::InvalidScale(config.scale));
        }
        let engine = provider.initialize().inspect_err(|e| error!("{e}"))?;
        let cache = Arc::new(Mutex::new(PageCache::new(config.cache_size)));
        Ok(Self {
            engine,
            config,
            state: SpreadState::new(),
            spread: RenderedSpread::default(),
            committed: false,
            document: None,
            service: None,
            pending: None,
            generation: 0,
            page_errors: Vec::new(),
            cache,
        })
    }

    /// Open `bytes` and start rendering the first spread.
    ///
    /// Replaces any previously loaded document; its in-flight renders are
    /// discarded.
    pub fn load_document(&mut self, bytes: Vec<u8>) -> Result<(), PreviewError> {
        let document = DocumentHandle::open(self.engine.as_ref(), bytes)
            .inspect_err(|e| error!("Failed to open document: {e}"))?;
        info!("Loaded document with {} pages", document.page_count());

        let page_count = document.page_count();
        self.service = None;
        self.document = Some(document);
        self.pending = None;
        self.spread = RenderedSpread::default();
        self.committed = false;
        self.page_errors.clear();

        let effects = self.state.apply(Command::SetPageCount(page_count));
        self.execute_effects(effects);
        Ok(())
    }

    /// Decode a stored data URL and load the document it carries
    pub fn load_data_url(&mut self, data_url: &str) -> Result<(), PreviewError> {
        let bytes = decode_data_url(data_url).inspect_err(|e| error!("{e}"))?;
        self.load_document(bytes)
    }

    pub fn go_to_previous_spread(&mut self) -> Navigation {
        self.navigate(Command::PreviousSpread)
    }

    pub fn go_to_next_spread(&mut self) -> Navigation {
        self.navigate(Command::NextSpread)
    }

    fn navigate(&mut self, cmd: Command) -> Navigation {
        if let Some(pending) = &self.pending {
            debug!(
                "Ignoring {cmd:?}: window {} still rendering",
                pending.window()
            );
            return Navigation::Busy;
        }

        let effects = self.state.apply(cmd);
        let target = effects.iter().find_map(|effect| match effect {
            Effect::RenderWindow(window) => Some(*window),
            Effect::InvalidateCache => None,
        });
        self.execute_effects(effects);

        target.map_or(Navigation::Ignored, Navigation::Started)
    }

    fn execute_effects(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::InvalidateCache => {
                    // Workers of a replaced document may still insert into the old cache.
                    self.cache
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .invalidate_all();
                    self.cache = Arc::new(Mutex::new(PageCache::new(self.config.cache_size)));
                }

                Effect::RenderWindow(window) => self.request_window(window),
            }
        }
    }

    fn request_window(&mut self, window: PageWindow) {
        let Some(document) = self.document.clone() else {
            return;
        };
        let service = self.service.get_or_insert_with(|| {
            RenderService::start(
                &self.engine,
                &document,
                self.config.workers,
                self.config.max_dimension,
                Arc::clone(&self.cache),
            )
        });

        self.generation += 1;
        let scale = self.config.scale;
        let mut pending = PendingSpread::new(self.generation, window);

        for (index, page) in window.pages().into_iter().enumerate() {
            if !document.contains(page) {
                pending.fill(index, None);
            } else if let Some(cached) = service.get_cached_page(page, scale) {
                pending.fill(index, Some(cached));
            } else {
                let id = service.request_page(self.generation, page, scale);
                pending.wait_for(index, id);
            }
        }
        debug!("Requested window {window} (generation {})", self.generation);

        self.pending = Some(pending);
        self.try_commit();
    }

    /// Apply finished renders without blocking. Returns true if a spread was
    /// committed.
    pub fn poll(&mut self) -> bool {
        let responses = match self.service.as_mut() {
            Some(service) => service.poll_responses(),
            None => return false,
        };
        for response in responses {
            self.settle(response);
        }
        self.try_commit()
    }

    /// Block until the pending spread commits.
    ///
    /// On timeout the pending spread is abandoned and the previous spread
    /// stays on screen.
    pub fn wait(&mut self) -> Result<(), PreviewError> {
        let timeout = self.config.render_timeout;
        let deadline = Instant::now() + timeout;

        while self.pending.is_some() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let response = match self.service.as_mut() {
                Some(service) if !remaining.is_zero() => service.recv_timeout(remaining),
                _ => None,
            };

            match response {
                Some(response) => {
                    self.settle(response);
                    self.try_commit();
                }
                None => {
                    if let Some(pending) = self.pending.take() {
                        warn!("Abandoning window {} after {timeout:?}", pending.window());
                    }
                    return Err(PreviewError::Timeout(timeout));
                }
            }
        }
        Ok(())
    }

    fn settle(&mut self, response: RenderResponse) {
        let Some(pending) = self.pending.as_mut() else {
            debug!("Discarding page {} with no spread pending", response.page);
            return;
        };
        if response.generation != pending.generation() {
            debug!(
                "Discarding stale page {} from generation {}",
                response.page, response.generation
            );
            return;
        }

        let image = response.outcome.image();
        if let PageOutcome::Failed(err) = response.outcome {
            warn!("Page {} unavailable: {}", err.page, err.source);
            self.page_errors.push(PreviewError::Render(err));
        }
        if !pending.settle(response.id, image) {
            debug!("Response {:?} matched no slot", response.id);
        }
    }

    fn try_commit(&mut self) -> bool {
        let Some(pending) = self.pending.take() else {
            return false;
        };
        match pending.finish() {
            Ok((window, spread)) => {
                let _ = self.state.apply(Command::Commit(window));
                self.spread = spread;
                self.committed = true;
                debug!("Committed window {window}");
                true
            }
            Err(pending) => {
                self.pending = Some(pending);
                false
            }
        }
    }

    /// Window of the spread on screen
    #[must_use]
    pub fn window(&self) -> PageWindow {
        self.state.window
    }

    #[must_use]
    pub fn total_pages(&self) -> usize {
        self.state.page_count
    }

    /// Images of the spread on screen
    #[must_use]
    pub fn spread(&self) -> &RenderedSpread {
        &self.spread
    }

    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.document.is_some()
    }

    /// Whether the first spread of the current document has been committed
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.committed
    }

    /// Whether a spread is still rendering
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.pending.is_some()
    }

    #[must_use]
    pub fn can_go_previous(&self) -> bool {
        self.state.can_go_previous()
    }

    #[must_use]
    pub fn can_go_next(&self) -> bool {
        self.state.can_go_next()
    }

    #[must_use]
    pub fn config(&self) -> &PreviewConfig {
        &self.config
    }

    /// Per-page failures since the last call
    pub fn take_page_errors(&mut self) -> Vec<PreviewError> {
        std::mem::take(&mut self.page_errors)
    }
}
