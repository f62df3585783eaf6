//! Service seams consumed by the review pipeline.

pub mod completer;
pub mod embedder;
pub mod extractor;
pub mod loader;

pub use completer::{CompletionRequest, Completer};
pub use embedder::Embedder;
pub use extractor::TextExtractor;
pub use loader::DocumentLoader;
