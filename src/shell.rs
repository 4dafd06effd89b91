//! View model of the preview screen

use std::fmt;
use std::sync::Arc;

use crate::error::PreviewError;
use crate::pdf::{PageWindow, RenderedPage};
use crate::preview::{Navigation, Previewer};
use crate::workflow::{PreviewSession, Route};

pub const PLACEHOLDER: &str = "No page available";
pub const LOADING: &str = "Loading PDF preview...";

/// What a spread slot shows
#[derive(Clone, Debug)]
pub enum SlotView {
    Page(Arc<RenderedPage>),
    Placeholder,
}

/// Screen state
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Screen {
    Loading,
    Ready,
    /// Terminal failure; the preview cannot continue
    Failed(String),
}

/// Snapshot of everything the preview screen displays
#[derive(Clone, Debug)]
pub struct ShellView {
    pub screen: Screen,
    pub window: PageWindow,
    pub total_pages: usize,
    pub slots: [SlotView; 2],
    pub previous_enabled: bool,
    pub next_enabled: bool,
}

impl ShellView {
    #[must_use]
    pub fn from_previewer(previewer: &Previewer) -> Self {
        let window = previewer.window();
        let total_pages = previewer.total_pages();
        let slots = previewer.spread().slots.clone().map(|slot| match slot {
            Some(page) => SlotView::Page(page),
            None => SlotView::Placeholder,
        });
        let screen = if previewer.is_ready() {
            Screen::Ready
        } else {
            Screen::Loading
        };

        Self {
            screen,
            window,
            total_pages,
            slots,
            previous_enabled: previewer.is_loaded() && window.start() != 1,
            next_enabled: previewer.is_loaded() && window.end() < total_pages,
        }
    }

    /// View for a preview that could not start or had to stop
    #[must_use]
    pub fn failed(err: &PreviewError) -> Self {
        Self {
            screen: Screen::Failed(err.user_message()),
            window: PageWindow::FIRST,
            total_pages: 0,
            slots: [SlotView::Placeholder, SlotView::Placeholder],
            previous_enabled: false,
            next_enabled: false,
        }
    }

    /// "Pages a-b of n"
    #[must_use]
    pub fn counter(&self) -> String {
        format!(
            "Pages {}-{} of {}",
            self.window.start(),
            self.window.end(),
            self.total_pages
        )
    }
}

impl fmt::Display for ShellView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.screen {
            Screen::Loading => return writeln!(f, "{LOADING}"),
            Screen::Failed(message) => return writeln!(f, "{message}"),
            Screen::Ready => {}
        }

        for (slot, page) in self.slots.iter().zip(self.window.pages()) {
            match slot {
                SlotView::Page(image) => writeln!(
                    f,
                    "[Page {page}] {}x{} px, {} bytes PNG",
                    image.width,
                    image.height,
                    image.png.len()
                )?,
                SlotView::Placeholder => writeln!(f, "[Page {page}] {PLACEHOLDER}")?,
            }
        }

        let previous = if self.previous_enabled { "[p] Previous" } else { "(Previous)" };
        let next = if self.next_enabled { "[n] Next" } else { "(Next)" };
        writeln!(f, "{previous}  {}  {next}", self.counter())?;
        writeln!(f, "[s] Print Your Book")
    }
}

/// User input on the preview screen
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShellAction {
    Previous,
    Next,
    Submit,
}

/// What the shell should do after an action
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShellOutcome {
    Navigated(Navigation),
    Leave(Route),
}

/// Apply a user action to the session
pub fn dispatch(session: &mut PreviewSession, action: ShellAction) -> ShellOutcome {
    match action {
        ShellAction::Previous => ShellOutcome::Navigated(session.previewer.go_to_previous_spread()),
        ShellAction::Next => ShellOutcome::Navigated(session.previewer.go_to_next_spread()),
        ShellAction::Submit => ShellOutcome::Leave(session.submit()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preview::PreviewConfig;
    use crate::test_utils::{FakeEngine, fake_pdf};

    fn session(pages: usize) -> PreviewSession {
        let mut previewer =
            Previewer::new(&FakeEngine::new().provider(), PreviewConfig::default()).unwrap();
        previewer.load_document(fake_pdf(pages)).unwrap();
        previewer.wait().unwrap();
        PreviewSession {
            previewer,
            project: None,
        }
    }

    #[test]
    fn loading_until_first_spread_commits() {
        let mut previewer =
            Previewer::new(&FakeEngine::new().provider(), PreviewConfig::default()).unwrap();
        assert_eq!(ShellView::from_previewer(&previewer).screen, Screen::Loading);

        previewer.load_document(fake_pdf(3)).unwrap();
        previewer.wait().unwrap();
        assert_eq!(ShellView::from_previewer(&previewer).screen, Screen::Ready);
    }

    #[test]
    fn single_page_shows_placeholder_and_disables_navigation() {
        let session = session(1);
        let view = ShellView::from_previewer(&session.previewer);

        assert!(matches!(view.slots[0], SlotView::Page(_)));
        assert!(matches!(view.slots[1], SlotView::Placeholder));
        assert!(!view.previous_enabled);
        assert!(!view.next_enabled);
        assert_eq!(view.counter(), "Pages 1-2 of 1");
        assert!(view.to_string().contains(PLACEHOLDER));
    }

    #[test]
    fn controls_follow_boundaries() {
        let mut session = session(4);
        let view = ShellView::from_previewer(&session.previewer);
        assert!(!view.previous_enabled);
        assert!(view.next_enabled);

        dispatch(&mut session, ShellAction::Next);
        session.previewer.wait().unwrap();
        let view = ShellView::from_previewer(&session.previewer);
        assert!(view.previous_enabled);
        assert!(!view.next_enabled);
        assert_eq!(view.counter(), "Pages 3-4 of 4");
    }

    #[test]
    fn submit_goes_to_checkout_while_rendering() {
        let engine = FakeEngine::new().with_delay(std::time::Duration::from_millis(50));
        let mut previewer = Previewer::new(&engine.provider(), PreviewConfig::default()).unwrap();
        previewer.load_document(fake_pdf(4)).unwrap();
        let mut session = PreviewSession {
            previewer,
            project: None,
        };

        assert!(session.previewer.is_busy());
        assert_eq!(
            dispatch(&mut session, ShellAction::Submit),
            ShellOutcome::Leave(Route::Checkout)
        );
    }

    #[test]
    fn failed_view_shows_message_only() {
        let view = ShellView::failed(&PreviewError::MissingInput);
        assert!(!view.previous_enabled && !view.next_enabled);
        assert_eq!(
            view.to_string(),
            "No PDF file found for preview. Please upload a file first.\n"
        );
    }
}
