//! Rasterizer Adapter: turns page 1 of a document into a PNG preview.
//!
//! Rendering is blocking, CPU-bound work; async callers go through
//! [`rasterize_first_page`], which moves it onto the blocking pool.

use std::sync::Arc;

use bytes::Bytes;
use thiserror::Error;

pub mod pdfium;

pub const PREVIEW_CONTENT_TYPE: &str = "image/png";

#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("PDF renderer unavailable: {0}")]
    RendererUnavailable(String),

    #[error("Document could not be opened: {0}")]
    InvalidDocument(String),

    #[error("Document is encrypted")]
    Encrypted,

    #[error("Document has no pages")]
    NoPages,

    #[error("Rendering failed: {0}")]
    Rendering(String),

    #[error("Image encoding failed: {0}")]
    Encoding(String),
}

/// Converts the first page of a document into an encoded raster image.
/// Deterministic for a given input.
pub trait Rasterizer: Send + Sync {
    fn rasterize_first_page(&self, document: &[u8]) -> Result<Vec<u8>, ConversionError>;
}

/// Runs the rasterizer on tokio's blocking pool.
pub async fn rasterize_first_page(
    rasterizer: Arc<dyn Rasterizer>,
    document: Bytes,
) -> Result<Bytes, ConversionError> {
    tokio::task::spawn_blocking(move || rasterizer.rasterize_first_page(&document))
        .await
        .map_err(|e| ConversionError::Rendering(format!("render task aborted: {e}")))?
        .map(Bytes::from)
}

/// Preview file name derived from the document's: `cv.pdf` → `cv.png`.
pub fn preview_file_name(document_name: &str) -> String {
    let stem = match document_name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => document_name,
    };
    format!("{stem}.png")
}
