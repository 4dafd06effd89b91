//! Render service - manages the worker pool for one document

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use flume::{Receiver, RecvTimeoutError, Sender};
use log::debug;

use super::cache::{CacheKey, PageCache};
use super::engine::{DocumentHandle, RenderEngine};
use super::request::{RenderRequest, RenderResponse, RequestId};
use super::types::RenderedPage;
use super::worker::{WorkerContext, render_worker};

/// Runs page renders for one document on worker threads
pub struct RenderService {
    request_tx: Sender<RenderRequest>,
    response_rx: Receiver<RenderResponse>,
    next_request_id: u64,
    cache: Arc<Mutex<PageCache>>,
    num_workers: usize,
}

impl RenderService {
    /// Spawn `num_workers` threads rendering pages of `document`
    #[must_use]
    pub fn start(
        engine: &Arc<dyn RenderEngine>,
        document: &DocumentHandle,
        num_workers: usize,
        max_dimension: u32,
        cache: Arc<Mutex<PageCache>>,
    ) -> Self {
        // flume gives an MPMC queue so several workers can pull from one request channel.
        let (request_tx, request_rx) = flume::unbounded();
        let (response_tx, response_rx) = flume::unbounded();

        let num_workers = num_workers.max(1);
        for _ in 0..num_workers {
            let ctx = WorkerContext {
                engine: Arc::clone(engine),
                document: document.clone(),
                max_dimension,
                cache: Arc::clone(&cache),
            };
            let rx = request_rx.clone();
            let tx = response_tx.clone();

            std::thread::spawn(move || {
                render_worker(ctx, rx, tx);
            });
        }
        debug!(
            "Started {num_workers} render workers for {} pages",
            document.page_count()
        );

        Self {
            request_tx,
            response_rx,
            next_request_id: 1,
            cache,
            num_workers,
        }
    }

    /// Queue a page render
    pub fn request_page(&mut self, generation: u64, page: usize, scale: f32) -> RequestId {
        let id = self.next_id();

        let _ = self.request_tx.send(RenderRequest::Page {
            id,
            generation,
            page,
            scale,
        });

        id
    }

    /// Collect every response that is ready without blocking
    pub fn poll_responses(&self) -> Vec<RenderResponse> {
        let mut responses = vec![];

        while let Ok(response) = self.response_rx.try_recv() {
            responses.push(response);
        }

        responses
    }

    /// Wait up to `timeout` for the next response
    pub fn recv_timeout(&self, timeout: Duration) -> Option<RenderResponse> {
        match self.response_rx.recv_timeout(timeout) {
            Ok(response) => Some(response),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Get a cached page if available
    #[must_use]
    pub fn get_cached_page(&self, page: usize, scale: f32) -> Option<Arc<RenderedPage>> {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&CacheKey::new(page, scale))
    }

    /// Shutdown all workers
    pub fn shutdown(&self) {
        for _ in 0..self.num_workers {
            let _ = self.request_tx.send(RenderRequest::Shutdown);
        }
    }

    fn next_id(&mut self) -> RequestId {
        let id = RequestId::new(self.next_request_id);
        self.next_request_id += 1;
        id
    }
}

impl Drop for RenderService {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::request::PageOutcome;
    use crate::test_utils::{FakeEngine, fake_pdf};

    fn start(pages: usize, engine: FakeEngine) -> RenderService {
        let engine: Arc<dyn RenderEngine> = Arc::new(engine);
        let handle = DocumentHandle::open(engine.as_ref(), fake_pdf(pages)).unwrap();
        RenderService::start(
            &engine,
            &handle,
            2,
            4096,
            Arc::new(Mutex::new(PageCache::new(8))),
        )
    }

    fn recv(service: &mut RenderService) -> RenderResponse {
        service
            .recv_timeout(Duration::from_secs(5))
            .expect("worker should answer")
    }

    #[test]
    fn renders_requested_page() {
        let mut service = start(3, FakeEngine::new());
        let id = service.request_page(1, 2, 1.5);

        let response = recv(&mut service);
        assert_eq!(response.id, id);
        assert_eq!(response.generation, 1);
        assert_eq!(response.page, 2);
        assert!(matches!(response.outcome, PageOutcome::Rendered(_)));
        assert!(service.get_cached_page(2, 1.5).is_some());
    }

    #[test]
    fn out_of_range_page_is_reported() {
        let mut service = start(1, FakeEngine::new());
        service.request_page(1, 2, 1.5);

        let response = recv(&mut service);
        assert!(matches!(response.outcome, PageOutcome::OutOfRange));
    }

    #[test]
    fn failed_page_is_reported() {
        let mut service = start(3, FakeEngine::new().failing_page(3));
        service.request_page(1, 3, 1.5);

        let response = recv(&mut service);
        match response.outcome {
            PageOutcome::Failed(err) => assert_eq!(err.page, 3),
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[test]
    fn cached_page_is_not_rendered_twice() {
        let engine = FakeEngine::new();
        let renders = engine.render_counter();
        let mut service = start(3, engine);

        service.request_page(1, 1, 1.5);
        recv(&mut service);
        service.request_page(2, 1, 1.5);
        recv(&mut service);

        assert_eq!(renders.load(std::sync::atomic::Ordering::SeqCst), 1);
    }
}
