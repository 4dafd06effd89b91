//! Spread navigation state

use std::sync::Arc;

use super::request::RequestId;
use super::types::{PageWindow, RenderedPage, RenderedSpread};

/// Committed window and page count of the loaded document
#[derive(Clone, Debug, Default)]
pub struct SpreadState {
    /// Window of the spread on screen
    pub window: PageWindow,

    /// Total page count
    pub page_count: usize,

    /// Whether a document has been loaded
    pub loaded: bool,
}

impl SpreadState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a command and return resulting effects.
    ///
    /// Navigation never moves the window directly; it asks for the target
    /// window to be rendered and the window changes on `Commit`.
    #[must_use]
    pub fn apply(&mut self, cmd: Command) -> Vec<Effect> {
        match cmd {
            Command::SetPageCount(count) => {
                self.page_count = count;
                self.loaded = true;
                self.window = PageWindow::FIRST;
                vec![Effect::InvalidateCache, Effect::RenderWindow(PageWindow::FIRST)]
            }

            Command::PreviousSpread => {
                if !self.can_go_previous() {
                    return vec![];
                }
                let start = self.window.start().saturating_sub(2).max(1);
                vec![Effect::RenderWindow(PageWindow::new(start))]
            }

            Command::NextSpread => {
                if !self.can_go_next() {
                    return vec![];
                }
                let start = (self.page_count - 1).min(self.window.end() + 1);
                vec![Effect::RenderWindow(PageWindow::new(start))]
            }

            Command::Commit(window) => {
                self.window = window;
                vec![]
            }
        }
    }

    #[must_use]
    pub fn can_go_previous(&self) -> bool {
        self.loaded && self.window.start() > 1
    }

    #[must_use]
    pub fn can_go_next(&self) -> bool {
        self.loaded && self.window.end() < self.page_count
    }
}

/// Commands that modify spread state
#[derive(Clone, Debug)]
pub enum Command {
    /// A document with this many pages was opened
    SetPageCount(usize),
    /// Step back one spread
    PreviousSpread,
    /// Step forward one spread
    NextSpread,
    /// Both pages of this window settled; show it
    Commit(PageWindow),
}

/// Effects produced by state changes
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Effect {
    /// Drop rendered pages of the previous document
    InvalidateCache,
    /// Render both pages of a window
    RenderWindow(PageWindow),
}

#[derive(Clone, Debug)]
enum Slot {
    Waiting(RequestId),
    Settled(Option<Arc<RenderedPage>>),
}

/// A spread whose two pages are still rendering.
///
/// Settles page by page and yields the spread only once both are in.
#[derive(Debug)]
pub struct PendingSpread {
    generation: u64,
    window: PageWindow,
    slots: [Slot; 2],
}

impl PendingSpread {
    #[must_use]
    pub fn new(generation: u64, window: PageWindow) -> Self {
        Self {
            generation,
            window,
            slots: [Slot::Settled(None), Slot::Settled(None)],
        }
    }

    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub fn window(&self) -> PageWindow {
        self.window
    }

    /// Mark slot `index` as waiting on `id`
    pub fn wait_for(&mut self, index: usize, id: RequestId) {
        self.slots[index] = Slot::Waiting(id);
    }

    /// Fill slot `index` without a request
    pub fn fill(&mut self, index: usize, page: Option<Arc<RenderedPage>>) {
        self.slots[index] = Slot::Settled(page);
    }

    /// Settle the slot waiting on `id`. Returns false if no slot was.
    pub fn settle(&mut self, id: RequestId, page: Option<Arc<RenderedPage>>) -> bool {
        for slot in &mut self.slots {
            if matches!(slot, Slot::Waiting(waiting) if *waiting == id) {
                *slot = Slot::Settled(page);
                return true;
            }
        }
        false
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.slots.iter().all(|slot| matches!(slot, Slot::Settled(_)))
    }

    /// The finished spread, or `self` back if a page is still rendering
    pub fn finish(self) -> Result<(PageWindow, RenderedSpread), Self> {
        if !self.is_complete() {
            return Err(self);
        }
        let [left, right] = self.slots.map(|slot| match slot {
            Slot::Settled(page) => page,
            Slot::Waiting(_) => None,
        });
        Ok((
            self.window,
            RenderedSpread {
                slots: [left, right],
            },
        ))
    }
}
