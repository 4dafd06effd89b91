//! Page rasterization and PNG encoding

use image::ImageEncoder;
use image::codecs::png::PngEncoder;
use log::debug;

use super::engine::{DocumentHandle, EngineFault, PageSource, RenderEngine};
use super::types::{Raster, RenderedPage};

/// A page within range failed to rasterize
#[derive(Debug, thiserror::Error)]
#[error("page {page}: {source}")]
pub struct RenderError {
    pub page: usize,
    pub source: EngineFault,
}

/// Whether `scale` can produce a page image
#[must_use]
pub fn is_valid_scale(scale: f32) -> bool {
    scale.is_finite() && scale > 0.0
}

/// Output size and effective scale for one page
#[derive(Clone, Copy, Debug, PartialEq)]
struct RasterSpec {
    scale: f32,
    width: u32,
    height: u32,
}

impl RasterSpec {
    fn compute(page_size: (f32, f32), scale: f32, max_dimension: u32) -> Self {
        let (page_width, page_height) = page_size;
        let mut scale = scale;
        let mut out_width = page_width * scale;
        let mut out_height = page_height * scale;

        let max_dim = out_width.max(out_height);
        let limit = max_dimension as f32;
        if max_dim > limit && max_dim > 0.0 {
            let reduction = limit / max_dim;
            scale *= reduction;
            out_width *= reduction;
            out_height *= reduction;
        }

        Self {
            scale,
            width: out_width.round().max(1.0) as u32,
            height: out_height.round().max(1.0) as u32,
        }
    }
}

/// Renders pages of one opened document
pub struct PageRenderer {
    source: Box<dyn PageSource>,
    max_dimension: u32,
}

impl PageRenderer {
    /// Open `handle` with `engine` for rendering on the current thread
    pub fn open(
        engine: &dyn RenderEngine,
        handle: &DocumentHandle,
        max_dimension: u32,
    ) -> Result<Self, EngineFault> {
        Ok(Self {
            source: engine.open(handle.bytes())?,
            max_dimension: max_dimension.max(1),
        })
    }

    #[must_use]
    pub fn page_count(&self) -> usize {
        self.source.page_count()
    }

    /// Render `page` (1-indexed) at `scale`.
    ///
    /// Pages outside the document yield `Ok(None)`.
    pub fn render(&self, page: usize, scale: f32) -> Result<Option<RenderedPage>, RenderError> {
        if page < 1 || page > self.page_count() {
            return Ok(None);
        }

        self.render_in_range(page, scale)
            .map(Some)
            .map_err(|source| RenderError { page, source })
    }

    fn render_in_range(&self, page: usize, scale: f32) -> Result<RenderedPage, EngineFault> {
        if !is_valid_scale(scale) {
            return Err(EngineFault::generic(format!("Invalid render scale {scale}")));
        }
        let index = page - 1;
        let page_size = self.source.page_size(index)?;
        let spec = RasterSpec::compute(page_size, scale, self.max_dimension);

        let raster = self.source.rasterize(index, spec.scale)?;
        let png = encode_png(&raster)?;
        debug!(
            "Rendered page {page}: {}x{} px at scale {:.3}, {} PNG bytes",
            raster.width,
            raster.height,
            spec.scale,
            png.len()
        );

        Ok(RenderedPage {
            page,
            width: raster.width,
            height: raster.height,
            scale: spec.scale,
            png,
        })
    }
}

fn encode_png(raster: &Raster) -> Result<Vec<u8>, EngineFault> {
    let expected = raster.width as usize * raster.height as usize * 3;
    if raster.width == 0 || raster.height == 0 || raster.pixels.len() != expected {
        return Err(EngineFault::generic(format!(
            "Raster buffer size mismatch: {} bytes for {}x{}",
            raster.pixels.len(),
            raster.width,
            raster.height
        )));
    }

    let mut png = Vec::new();
    PngEncoder::new(&mut png).write_image(
        &raster.pixels,
        raster.width,
        raster.height,
        image::ExtendedColorType::Rgb8,
    )?;
    Ok(png)
}
