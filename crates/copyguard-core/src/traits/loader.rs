//! Rule document loader trait.

use std::path::Path;

use crate::error::Result;
use crate::types::TextBlock;

/// Reads a document into an ordered list of raw text blocks.
///
/// Implementations fail with `FileNotFound` when the path does not exist.
pub trait DocumentLoader: Send + Sync {
    fn load(&self, path: &Path) -> Result<Vec<TextBlock>>;
}
