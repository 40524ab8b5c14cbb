//! First-page rendering via Google PDFium.
//!
//! `PdfiumRasterizer` is stateless. Each call binds a fresh `Pdfium` instance
//! because the upstream type is `!Send`; the OS caches the library load.

use std::io::Cursor;

use image::ImageOutputFormat;
use pdfium_render::prelude::*;
use tracing::{debug, warn};

use super::{ConversionError, Rasterizer};

/// Largest width or height of a rendered preview.
const MAX_DIMENSION_PX: u32 = 2048;

/// Preview resolution. Enough to read a résumé, small enough to upload quickly.
pub const PREVIEW_DPI: u32 = 150;

const POINTS_PER_INCH: f32 = 72.0;

pub struct PdfiumRasterizer {
    dpi: u32,
}

impl PdfiumRasterizer {
    /// Creates a rasterizer, verifying the PDFium library is loadable.
    pub fn new() -> Result<Self, ConversionError> {
        let _ = load_pdfium()?;
        Ok(Self { dpi: PREVIEW_DPI })
    }
}

/// Binds PDFium from `PDFIUM_DYNAMIC_LIB_PATH`, then next to the executable,
/// then from the system library path.
fn load_pdfium() -> Result<Pdfium, ConversionError> {
    if let Ok(path) = std::env::var("PDFIUM_DYNAMIC_LIB_PATH") {
        debug!(path = %path, "Loading PDFium from env var");
        let bindings = Pdfium::bind_to_library(&path).map_err(|e| {
            ConversionError::RendererUnavailable(format!("failed to load PDFium from {path}: {e}"))
        })?;
        return Ok(Pdfium::new(bindings));
    }

    if let Some(exe_dir) = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|p| p.to_path_buf()))
    {
        let lib_path =
            Pdfium::pdfium_platform_library_name_at_path(exe_dir.to_string_lossy().as_ref());
        if let Ok(bindings) = Pdfium::bind_to_library(&lib_path) {
            debug!(dir = %exe_dir.display(), "Loaded PDFium next to executable");
            return Ok(Pdfium::new(bindings));
        }
    }

    let bindings = Pdfium::bind_to_system_library().map_err(|e| {
        ConversionError::RendererUnavailable(format!(
            "PDFium library not found. Set PDFIUM_DYNAMIC_LIB_PATH or install PDFium: {e}"
        ))
    })?;
    Ok(Pdfium::new(bindings))
}

fn map_load_error(e: PdfiumError) -> ConversionError {
    let msg = e.to_string();
    let lower = msg.to_lowercase();
    if lower.contains("password") || lower.contains("encrypt") {
        ConversionError::Encrypted
    } else {
        ConversionError::InvalidDocument(msg)
    }
}

/// Pixel dimensions for a page, both clamped to [1, MAX_DIMENSION_PX] with
/// the aspect ratio preserved.
fn render_dimensions(width_points: f32, height_points: f32, dpi: u32) -> (u32, u32) {
    let raw_w = (width_points * dpi as f32 / POINTS_PER_INCH).max(1.0);
    let raw_h = (height_points * dpi as f32 / POINTS_PER_INCH).max(1.0);

    let max_dim = raw_w.max(raw_h);
    if max_dim > MAX_DIMENSION_PX as f32 {
        let ratio = MAX_DIMENSION_PX as f32 / max_dim;
        let w = ((raw_w * ratio).round() as u32).clamp(1, MAX_DIMENSION_PX);
        let h = ((raw_h * ratio).round() as u32).clamp(1, MAX_DIMENSION_PX);
        (w, h)
    } else {
        (raw_w as u32, raw_h as u32)
    }
}

impl Rasterizer for PdfiumRasterizer {
    fn rasterize_first_page(&self, document: &[u8]) -> Result<Vec<u8>, ConversionError> {
        let pdfium = load_pdfium()?;
        let pdf = pdfium
            .load_pdf_from_byte_slice(document, None)
            .map_err(map_load_error)?;

        let pages = pdf.pages();
        if pages.len() == 0 {
            return Err(ConversionError::NoPages);
        }
        let page = pages
            .get(0)
            .map_err(|e| ConversionError::Rendering(format!("page 1 unavailable: {e}")))?;

        let (target_w, target_h) =
            render_dimensions(page.width().value, page.height().value, self.dpi);
        if target_w == MAX_DIMENSION_PX || target_h == MAX_DIMENSION_PX {
            warn!(
                width = target_w,
                height = target_h,
                "Preview dimensions capped to {MAX_DIMENSION_PX}px"
            );
        }

        let config = PdfRenderConfig::new()
            .set_target_width(target_w as i32)
            .set_maximum_height(target_h as i32);

        let bitmap = page
            .render_with_config(&config)
            .map_err(|e| ConversionError::Rendering(e.to_string()))?;

        let mut cursor = Cursor::new(Vec::new());
        bitmap
            .as_image()
            .write_to(&mut cursor, ImageOutputFormat::Png)
            .map_err(|e| ConversionError::Encoding(e.to_string()))?;

        let png = cursor.into_inner();
        debug!(
            width = target_w,
            height = target_h,
            png_size = png.len(),
            "Rendered first page preview"
        );
        Ok(png)
    }
}
