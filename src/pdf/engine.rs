//! Rendering engine seam and the lazily initialized provider

use std::sync::{Arc, Mutex, PoisonError};

use log::{debug, info};

use super::types::Raster;
use crate::error::PreviewError;

/// Errors raised by a rendering engine
#[derive(Debug, thiserror::Error)]
pub enum EngineFault {
    #[cfg(feature = "pdf")]
    #[error("PDF engine: {0}")]
    Pdf(#[from] mupdf::error::Error),

    #[error("PNG encoding: {0}")]
    Encode(#[from] image::ImageError),

    #[error("{detail}")]
    Generic { detail: String },
}

impl EngineFault {
    pub fn generic(msg: impl Into<String>) -> Self {
        Self::Generic { detail: msg.into() }
    }
}

/// A document rendering engine.
///
/// Shared across threads; documents opened from it are not.
pub trait RenderEngine: Send + Sync {
    fn name(&self) -> &str;

    /// Parse `bytes` as a paged document
    fn open(&self, bytes: &[u8]) -> Result<Box<dyn PageSource>, EngineFault>;
}

/// An opened document. Page indices are 0-based.
pub trait PageSource {
    fn page_count(&self) -> usize;

    /// Page size in points at scale 1.0
    fn page_size(&self, index: usize) -> Result<(f32, f32), EngineFault>;

    /// Rasterize a page to packed RGB at the given scale
    fn rasterize(&self, index: usize, scale: f32) -> Result<Raster, EngineFault>;
}

type EngineFactory = Box<dyn Fn() -> Result<Arc<dyn RenderEngine>, EngineFault> + Send + Sync>;

/// Owns the process's rendering engine and creates it on first use.
///
/// A failed initialization is not remembered, so a later call retries.
pub struct EngineProvider {
    factory: EngineFactory,
    engine: Mutex<Option<Arc<dyn RenderEngine>>>,
}

impl EngineProvider {
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn() -> Result<Arc<dyn RenderEngine>, EngineFault> + Send + Sync + 'static,
    {
        Self {
            factory: Box::new(factory),
            engine: Mutex::new(None),
        }
    }

    /// Provider for an engine that already exists
    pub fn with_engine(engine: Arc<dyn RenderEngine>) -> Self {
        Self::new(move || Ok(Arc::clone(&engine)))
    }

    /// Provider backed by MuPDF
    #[cfg(feature = "pdf")]
    #[must_use]
    pub fn mupdf() -> Self {
        Self::new(|| {
            let engine = super::mupdf_backend::MupdfEngine::initialize()?;
            Ok(Arc::new(engine) as Arc<dyn RenderEngine>)
        })
    }

    /// Get the engine, creating it if this is the first call
    pub fn initialize(&self) -> Result<Arc<dyn RenderEngine>, PreviewError> {
        let mut slot = self.engine.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(engine) = slot.as_ref() {
            return Ok(Arc::clone(engine));
        }

        let engine = (self.factory)().map_err(PreviewError::EngineInit)?;
        info!("Rendering engine initialized: {}", engine.name());
        *slot = Some(Arc::clone(&engine));
        Ok(engine)
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.engine
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

/// An opened document's bytes and page count.
///
/// Cheap to clone; each render worker opens its own engine document from
/// the shared bytes.
#[derive(Clone)]
pub struct DocumentHandle {
    bytes: Arc<[u8]>,
    page_count: usize,
}

impl DocumentHandle {
    /// Parse `bytes` with `engine`, failing if they are not a valid document
    pub fn open(engine: &dyn RenderEngine, bytes: impl Into<Arc<[u8]>>) -> Result<Self, PreviewError> {
        let bytes = bytes.into();
        let source = engine
            .open(&bytes)
            .map_err(PreviewError::MalformedDocument)?;
        let page_count = source.page_count();
        debug!("Opened document: {} bytes, {page_count} pages", bytes.len());
        Ok(Self { bytes, page_count })
    }

    #[must_use]
    pub fn page_count(&self) -> usize {
        self.page_count
    }

    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Whether `page` (1-indexed) exists in the document
    #[must_use]
    pub fn contains(&self, page: usize) -> bool {
        (1..=self.page_count).contains(&page)
    }
}

impl std::fmt::Debug for DocumentHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentHandle")
            .field("bytes", &self.bytes.len())
            .field("page_count", &self.page_count)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::test_utils::{FakeEngine, fake_pdf};

    #[test]
    fn initialize_runs_factory_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let provider = EngineProvider::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(FakeEngine::new()) as Arc<dyn RenderEngine>)
        });

        assert!(!provider.is_initialized());
        let first = provider.initialize().unwrap();
        let second = provider.initialize().unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(provider.is_initialized());
    }

    #[test]
    fn failed_initialization_is_retried() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let provider = EngineProvider::new(move || {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(EngineFault::generic("worker asset missing"))
            } else {
                Ok(Arc::new(FakeEngine::new()) as Arc<dyn RenderEngine>)
            }
        });

        let err = provider.initialize().err().unwrap();
        assert!(matches!(err, PreviewError::EngineInit(_)));
        assert!(!provider.is_initialized());

        assert!(provider.initialize().is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn open_reports_page_count() {
        let engine = FakeEngine::new();
        let handle = DocumentHandle::open(&engine, fake_pdf(10)).unwrap();
        assert_eq!(handle.page_count(), 10);
        assert!(handle.contains(1));
        assert!(handle.contains(10));
        assert!(!handle.contains(0));
        assert!(!handle.contains(11));
    }

    #[test]
    fn open_rejects_garbage() {
        let engine = FakeEngine::new();
        let err = DocumentHandle::open(&engine, b"hello".to_vec()).unwrap_err();
        assert!(matches!(err, PreviewError::MalformedDocument(_)));
    }
}
