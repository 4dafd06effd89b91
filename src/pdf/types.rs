//! Core types for spread rendering

use std::sync::Arc;

use crate::decode::encode_data_url;

/// Raw rasterized page before PNG encoding.
///
/// Pixels are packed RGB, 3 bytes per pixel, row-major with no padding.
#[derive(Clone)]
pub struct Raster {
    pub pixels: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl std::fmt::Debug for Raster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Raster")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.pixels.len())
            .finish()
    }
}

/// A page rendered to an embeddable PNG
#[derive(Clone)]
pub struct RenderedPage {
    /// Page number (1-indexed)
    pub page: usize,
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
    /// Scale actually applied, after clamping to the maximum dimension
    pub scale: f32,
    /// PNG-encoded image
    pub png: Vec<u8>,
}

impl RenderedPage {
    /// The image as a `data:image/png;base64,...` string
    #[must_use]
    pub fn to_data_url(&self) -> String {
        encode_data_url("image/png", &self.png)
    }
}

impl std::fmt::Debug for RenderedPage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderedPage")
            .field("page", &self.page)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("scale", &self.scale)
            .field("png_bytes", &self.png.len())
            .finish()
    }
}

/// The two page numbers of a visible spread, `(start, start + 1)`.
///
/// `start` is at least 1. The upper page may lie past the end of the
/// document, in which case its slot stays empty.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PageWindow {
    start: usize,
}

impl PageWindow {
    pub const FIRST: Self = Self { start: 1 };

    #[must_use]
    pub fn new(start: usize) -> Self {
        Self {
            start: start.max(1),
        }
    }

    #[must_use]
    pub const fn start(self) -> usize {
        self.start
    }

    #[must_use]
    pub const fn end(self) -> usize {
        self.start + 1
    }

    #[must_use]
    pub const fn pages(self) -> [usize; 2] {
        [self.start, self.start + 1]
    }
}

impl Default for PageWindow {
    fn default() -> Self {
        Self::FIRST
    }
}

impl std::fmt::Display for PageWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.start(), self.end())
    }
}

/// Rendered images for the current window, left then right.
///
/// A slot is `None` when its page is out of range or failed to render.
#[derive(Clone, Debug, Default)]
pub struct RenderedSpread {
    pub slots: [Option<Arc<RenderedPage>>; 2],
}

impl RenderedSpread {
    #[must_use]
    pub fn left(&self) -> Option<&Arc<RenderedPage>> {
        self.slots[0].as_ref()
    }

    #[must_use]
    pub fn right(&self) -> Option<&Arc<RenderedPage>> {
        self.slots[1].as_ref()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_start_is_at_least_one() {
        assert_eq!(PageWindow::new(0), PageWindow::FIRST);
        assert_eq!(PageWindow::new(5).pages(), [5, 6]);
        assert_eq!(PageWindow::new(5).to_string(), "(5, 6)");
    }

    #[test]
    fn data_url_is_png() {
        let page = RenderedPage {
            page: 1,
            width: 1,
            height: 1,
            scale: 1.5,
            png: vec![0x89, b'P', b'N', b'G'],
        };
        assert_eq!(page.to_data_url(), "data:image/png;base64,iVBORw==");
    }
}
