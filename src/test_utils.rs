//! In-memory rendering engine for tests.
//!
//! Fake documents are the bytes `FAKEPDF:<pages>`; anything else is
//! rejected as malformed.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::decode::encode_data_url;
use crate::pdf::{EngineFault, EngineProvider, PageSource, Raster, RenderEngine};

const FAKE_MAGIC: &str = "FAKEPDF:";

/// Bytes of a fake document with `pages` pages
#[must_use]
pub fn fake_pdf(pages: usize) -> Vec<u8> {
    format!("{FAKE_MAGIC}{pages}").into_bytes()
}

/// Data URL of a fake document, as the upload step would store it
#[must_use]
pub fn fake_pdf_data_url(pages: usize) -> String {
    encode_data_url("application/pdf", &fake_pdf(pages))
}

/// Provider whose engine can never be initialized
#[must_use]
pub fn failing_provider() -> EngineProvider {
    EngineProvider::new(|| Err(EngineFault::generic("renderer worker asset missing")))
}

/// Deterministic engine producing solid-color pages
#[derive(Clone)]
pub struct FakeEngine {
    page_size: (f32, f32),
    failing_pages: HashSet<usize>,
    delay: Option<Duration>,
    renders: Arc<AtomicUsize>,
    opens: Arc<AtomicUsize>,
}

impl Default for FakeEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeEngine {
    #[must_use]
    pub fn new() -> Self {
        Self {
            page_size: (40.0, 60.0),
            failing_pages: HashSet::new(),
            delay: None,
            renders: Arc::new(AtomicUsize::new(0)),
            opens: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Page size in points for every page
    #[must_use]
    pub fn with_page_size(mut self, width: f32, height: f32) -> Self {
        self.page_size = (width, height);
        self
    }

    /// Make `page` (1-indexed) fail to rasterize
    #[must_use]
    pub fn failing_page(mut self, page: usize) -> Self {
        self.failing_pages.insert(page);
        self
    }

    /// Sleep this long before each rasterization
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of pages rasterized so far, across clones
    #[must_use]
    pub fn render_count(&self) -> usize {
        self.renders.load(Ordering::SeqCst)
    }

    /// Shared rasterization counter, usable after the engine was moved
    #[must_use]
    pub fn render_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.renders)
    }

    /// Number of documents opened so far, across clones
    #[must_use]
    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    /// Provider handing out this engine
    #[must_use]
    pub fn provider(&self) -> EngineProvider {
        EngineProvider::with_engine(Arc::new(self.clone()))
    }
}

impl RenderEngine for FakeEngine {
    fn name(&self) -> &str {
        "fake"
    }

    fn open(&self, bytes: &[u8]) -> Result<Box<dyn PageSource>, EngineFault> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        let text = std::str::from_utf8(bytes)
            .map_err(|_| EngineFault::generic("not a fake document"))?;
        let pages = text
            .strip_prefix(FAKE_MAGIC)
            .and_then(|count| count.trim().parse::<usize>().ok())
            .ok_or_else(|| EngineFault::generic("not a fake document"))?;

        Ok(Box::new(FakeDocument {
            pages,
            engine: self.clone(),
        }))
    }
}

struct FakeDocument {
    pages: usize,
    engine: FakeEngine,
}

impl PageSource for FakeDocument {
    fn page_count(&self) -> usize {
        self.pages
    }

    fn page_size(&self, index: usize) -> Result<(f32, f32), EngineFault> {
        if index >= self.pages {
            return Err(EngineFault::generic(format!("no page at index {index}")));
        }
        Ok(self.engine.page_size)
    }

    fn rasterize(&self, index: usize, scale: f32) -> Result<Raster, EngineFault> {
        if let Some(delay) = self.engine.delay {
            std::thread::sleep(delay);
        }
        if index >= self.pages || self.engine.failing_pages.contains(&(index + 1)) {
            return Err(EngineFault::generic(format!(
                "corrupt content stream on page {}",
                index + 1
            )));
        }
        self.engine.renders.fetch_add(1, Ordering::SeqCst);

        let (width, height) = self.engine.page_size;
        let width = (width * scale).round().max(1.0) as u32;
        let height = (height * scale).round().max(1.0) as u32;
        let shade = (index * 37 % 256) as u8;
        let pixels = [shade, 255 - shade, 128].repeat(width as usize * height as usize);

        Ok(Raster {
            pixels,
            width,
            height,
        })
    }
}
