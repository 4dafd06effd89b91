//! MuPDF-backed rendering engine

use log::debug;
use mupdf::{Colorspace, Document, Matrix};

use super::engine::{EngineFault, PageSource, RenderEngine};
use super::types::Raster;

const PDF_MIME: &str = "application/pdf";

/// MuPDF engine. MuPDF keeps a context per thread, so there is nothing to
/// share beyond this marker; each document lives on the thread that opened it.
#[derive(Debug)]
pub struct MupdfEngine {
    _private: (),
}

impl MupdfEngine {
    pub fn initialize() -> Result<Self, EngineFault> {
        // Fail here rather than on the first page if the colorspace tables are unusable.
        let rgb = Colorspace::device_rgb();
        if rgb.n() != 3 {
            return Err(EngineFault::generic(format!(
                "Unexpected device RGB colorspace with {} components",
                rgb.n()
            )));
        }
        Ok(Self { _private: () })
    }
}

impl RenderEngine for MupdfEngine {
    fn name(&self) -> &str {
        "mupdf"
    }

    fn open(&self, bytes: &[u8]) -> Result<Box<dyn PageSource>, EngineFault> {
        let doc = Document::from_bytes(bytes, PDF_MIME)?;
        if doc.needs_password()? {
            return Err(EngineFault::generic("Document is password protected"));
        }
        let page_count = usize::try_from(doc.page_count()?).unwrap_or(0);
        debug!("MuPDF opened document with {page_count} pages");
        Ok(Box::new(MupdfSource { doc, page_count }))
    }
}

struct MupdfSource {
    doc: Document,
    page_count: usize,
}

impl MupdfSource {
    fn page_index(&self, index: usize) -> Result<i32, EngineFault> {
        if index >= self.page_count {
            return Err(EngineFault::generic(format!(
                "Page index {index} out of range (document has {} pages)",
                self.page_count
            )));
        }
        i32::try_from(index).map_err(|_| EngineFault::generic("Page index overflow"))
    }
}

impl PageSource for MupdfSource {
    fn page_count(&self) -> usize {
        self.page_count
    }

    fn page_size(&self, index: usize) -> Result<(f32, f32), EngineFault> {
        let page = self.doc.load_page(self.page_index(index)?)?;
        let bounds = page.bounds()?;
        Ok((bounds.x1 - bounds.x0, bounds.y1 - bounds.y0))
    }

    fn rasterize(&self, index: usize, scale: f32) -> Result<Raster, EngineFault> {
        let page = self.doc.load_page(self.page_index(index)?)?;
        let transform = Matrix::new_scale(scale, scale);
        let pixmap = page.to_pixmap(&transform, &Colorspace::device_rgb(), false, false)?;

        let (width, height) = (pixmap.width(), pixmap.height());
        let channels = usize::try_from(pixmap.n()).unwrap_or(0);
        let stride = usize::try_from(pixmap.stride()).unwrap_or(0);
        let row_len = width as usize * channels;
        let samples = pixmap.samples();
        if channels < 3
            || row_len == 0
            || stride < row_len
            || samples.len() < stride * height as usize
        {
            return Err(EngineFault::generic(format!(
                "Unexpected {width}x{height} pixmap: {channels} channels, stride {stride}"
            )));
        }

        // Rows may be padded past `row_len`; any alpha or spot channels are dropped.
        let pixels = samples
            .chunks(stride)
            .take(height as usize)
            .flat_map(|row| row[..row_len].chunks_exact(channels))
            .flat_map(|px| &px[..3])
            .copied()
            .collect();

        Ok(Raster {
            pixels,
            width,
            height,
        })
    }
}
