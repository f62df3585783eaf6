//! Image text extraction (OCR) trait.

use std::path::Path;

use async_trait::async_trait;

use crate::error::Result;

/// File extensions treated as images.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "gif", "tiff", "webp"];

/// Check whether a path has an image extension.
pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Extracts visible text from an image.
///
/// An empty string means "no text found"; it is not an error.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    fn name(&self) -> &str;

    async fn extract_text(&self, image: &Path) -> Result<String>;

    fn supports(&self, path: &Path) -> bool {
        is_image_file(path)
    }
}
