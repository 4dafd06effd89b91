use std::time::Duration;

use bookpreview::session::{PROJECT_KEY, ProjectMetadata, SessionStore};
use bookpreview::shell::{ShellAction, ShellOutcome, ShellView, SlotView, dispatch};
use bookpreview::test_utils::{FakeEngine, failing_provider, fake_pdf, fake_pdf_data_url};
use bookpreview::{Entry, Navigation, PageWindow, PreviewConfig, PreviewError, PreviewSession, Route, enter_preview};

fn ready(entry: Entry) -> PreviewSession {
    match entry {
        Entry::Ready(session) => session,
        Entry::Redirect { route, .. } => panic!("unexpected redirect to {route:?}"),
    }
}

fn stored(pages: usize) -> SessionStore {
    let mut store = SessionStore::ephemeral();
    store.store_document(&fake_pdf(pages), None).unwrap();
    store
}

fn window(session: &PreviewSession) -> (usize, usize) {
    let window = session.previewer.window();
    (window.start(), window.end())
}

#[test]
fn ten_pages_forward_and_back() {
    let engine = FakeEngine::new();
    let store = stored(10);
    let mut session =
        ready(enter_preview(&store, &engine.provider(), PreviewConfig::default()).unwrap());
    session.previewer.wait().unwrap();
    assert_eq!(window(&session), (1, 2));

    let mut seen = vec![window(&session)];
    while session.previewer.can_go_next() {
        assert!(matches!(
            dispatch(&mut session, ShellAction::Next),
            ShellOutcome::Navigated(Navigation::Started(_))
        ));
        session.previewer.wait().unwrap();
        seen.push(window(&session));
    }
    assert_eq!(seen, vec![(1, 2), (3, 4), (5, 6), (7, 8), (9, 10)]);

    assert_eq!(
        dispatch(&mut session, ShellAction::Next),
        ShellOutcome::Navigated(Navigation::Ignored)
    );

    let mut back = Vec::new();
    while session.previewer.can_go_previous() {
        dispatch(&mut session, ShellAction::Previous);
        session.previewer.wait().unwrap();
        back.push(window(&session));
    }
    assert_eq!(back, vec![(7, 8), (5, 6), (3, 4), (1, 2)]);
    assert_eq!(
        dispatch(&mut session, ShellAction::Previous),
        ShellOutcome::Navigated(Navigation::Ignored)
    );
}

#[test]
fn single_page_document() {
    let store = stored(1);
    let mut session =
        ready(enter_preview(&store, &FakeEngine::new().provider(), PreviewConfig::default()).unwrap());
    session.previewer.wait().unwrap();

    let view = ShellView::from_previewer(&session.previewer);
    assert!(matches!(&view.slots[0], SlotView::Page(page) if page.page == 1));
    assert!(matches!(view.slots[1], SlotView::Placeholder));
    assert!(!view.previous_enabled);
    assert!(!view.next_enabled);
    assert_eq!(
        dispatch(&mut session, ShellAction::Next),
        ShellOutcome::Navigated(Navigation::Ignored)
    );
}

#[test]
fn odd_page_count_ends_on_last_pair() {
    let store = stored(5);
    let mut session =
        ready(enter_preview(&store, &FakeEngine::new().provider(), PreviewConfig::default()).unwrap());
    session.previewer.wait().unwrap();

    for _ in 0..10 {
        dispatch(&mut session, ShellAction::Next);
        session.previewer.wait().unwrap();
    }
    assert_eq!(window(&session), (4, 5));

    dispatch(&mut session, ShellAction::Previous);
    session.previewer.wait().unwrap();
    assert_eq!(window(&session), (2, 3));

    dispatch(&mut session, ShellAction::Previous);
    session.previewer.wait().unwrap();
    assert_eq!(window(&session), (1, 2));
}

#[test]
fn rendered_pages_are_png_at_preview_scale() {
    let engine = FakeEngine::new().with_page_size(612.0, 792.0);
    let store = stored(2);
    let mut session = ready(enter_preview(&store, &engine.provider(), PreviewConfig::default()).unwrap());
    session.previewer.wait().unwrap();

    let left = session.previewer.spread().left().cloned().unwrap();
    assert_eq!((left.width, left.height), (918, 1188));
    assert!(left.png.starts_with(&[0x89, b'P', b'N', b'G']));
    assert!(left.to_data_url().starts_with("data:image/png;base64,"));
}

#[test]
fn missing_document_redirects_without_engine() {
    let store = SessionStore::ephemeral();
    let entry = enter_preview(&store, &failing_provider(), PreviewConfig::default()).unwrap();

    match entry {
        Entry::Redirect { route, message } => {
            assert_eq!(route, Route::Upload);
            assert_eq!(route.path(), "/design-project");
            assert!(message.contains("upload"));
        }
        Entry::Ready(_) => panic!("expected a redirect"),
    }
}

#[test]
fn engine_init_failure_is_terminal() {
    let store = stored(3);
    let err = match enter_preview(&store, &failing_provider(), PreviewConfig::default()) {
        Err(err) => err,
        Ok(_) => panic!("expected engine failure"),
    };
    assert!(matches!(err, PreviewError::EngineInit(_)));
    assert!(!err.is_recoverable());
    assert_eq!(err.user_message(), "PDF processor failed to initialize.");
}

#[test]
fn malformed_document_is_reported() {
    let mut store = SessionStore::ephemeral();
    store.store_document(b"not a pdf", None).unwrap();
    let err = match enter_preview(&store, &FakeEngine::new().provider(), PreviewConfig::default()) {
        Err(err) => err,
        Ok(_) => panic!("expected a malformed document"),
    };
    assert!(matches!(err, PreviewError::MalformedDocument(_)));
}

#[test]
fn failing_page_leaves_placeholder_and_keeps_navigation() {
    let engine = FakeEngine::new().failing_page(4);
    let store = stored(6);
    let mut session = ready(enter_preview(&store, &engine.provider(), PreviewConfig::default()).unwrap());
    session.previewer.wait().unwrap();

    dispatch(&mut session, ShellAction::Next);
    session.previewer.wait().unwrap();
    assert_eq!(window(&session), (3, 4));
    assert!(session.previewer.spread().left().is_some());
    assert!(session.previewer.spread().right().is_none());

    let errors = session.previewer.take_page_errors();
    assert_eq!(errors.len(), 1);
    assert!(matches!(&errors[0], PreviewError::Render(err) if err.page == 4));

    dispatch(&mut session, ShellAction::Next);
    session.previewer.wait().unwrap();
    assert_eq!(window(&session), (5, 6));
}

#[test]
fn navigation_while_rendering_is_busy() {
    let engine = FakeEngine::new().with_delay(Duration::from_millis(30));
    let store = stored(8);
    let mut session = ready(enter_preview(&store, &engine.provider(), PreviewConfig::default()).unwrap());

    assert_eq!(
        dispatch(&mut session, ShellAction::Next),
        ShellOutcome::Navigated(Navigation::Busy)
    );
    session.previewer.wait().unwrap();
    assert_eq!(session.previewer.window(), PageWindow::FIRST);
}

#[test]
fn submit_leads_to_checkout_with_project_data() {
    let mut store = SessionStore::ephemeral();
    let project: ProjectMetadata = serde_json::from_str(r#"{"title":"My Book"}"#).unwrap();
    store.store_document(&fake_pdf(2), Some(&project)).unwrap();
    assert!(store.get(PROJECT_KEY).is_some());

    let mut session =
        ready(enter_preview(&store, &FakeEngine::new().provider(), PreviewConfig::default()).unwrap());
    assert_eq!(
        session.project.as_ref().and_then(|p| p.get("title")),
        Some(&serde_json::json!("My Book"))
    );
    assert_eq!(
        dispatch(&mut session, ShellAction::Submit),
        ShellOutcome::Leave(Route::Checkout)
    );
}

#[test]
fn session_file_survives_reload() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");

    let mut store = SessionStore::with_file(&path);
    store.store_document(&fake_pdf(4), None).unwrap();

    let reloaded = SessionStore::load_from_file(&path).unwrap();
    assert_eq!(
        reloaded.stored_document().unwrap().data_url(),
        fake_pdf_data_url(4)
    );
    assert!(reloaded.saved_at().is_some());

    let mut session =
        ready(enter_preview(&reloaded, &FakeEngine::new().provider(), PreviewConfig::default()).unwrap());
    session.previewer.wait().unwrap();
    assert_eq!(session.previewer.total_pages(), 4);
}

#[test]
fn zero_scale_stops_before_rendering() {
    let engine = FakeEngine::new();
    let store = stored(2);
    let config = PreviewConfig {
        scale: 0.0,
        ..PreviewConfig::default()
    };
    let err = match enter_preview(&store, &engine.provider(), config) {
        Err(err) => err,
        Ok(_) => panic!("expected the scale to be refused"),
    };
    assert!(matches!(err, PreviewError::InvalidScale(_)));
    assert_eq!(engine.render_count(), 0);
}
