//! Service facade: the four user-facing operations behind one router.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use copyguard_core::deadline::bounded;
use copyguard_core::error::{CopyGuardError, Result};
use copyguard_core::traits::{Completer, TextExtractor};
use copyguard_core::types::TextBlock;
use copyguard_knowledge::{KnowledgeStatus, RuleChunkStore, RuleDocumentLoader, load_many};
use serde::Serialize;

use crate::matcher::MatchSettings;
use crate::pipeline::{ReviewOutcome, ReviewPipeline};

/// Every operation the service exposes.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// Review text, an image, or both.
    SmartReview {
        text: String,
        image_path: Option<PathBuf>,
    },
    KnowledgeStatus,
    AddCustomRules { rules: String },
    /// Rebuild the knowledge base from the configured rules document.
    ReloadRuleDocument,
}

/// Result of [`ReviewService::dispatch`]. `Display` renders it for humans.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OperationOutput {
    Review(ImageReview),
    Status(KnowledgeStatus),
    RulesAdded { chunks: usize },
    DocumentReloaded { reloaded: bool },
}

impl fmt::Display for OperationOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Review(review) => f.write_str(&review.render()),
            Self::Status(status) => {
                let state = if status.initialized { "initialized" } else { "not initialized" };
                write!(f, "Knowledge base: {state}, chunks: {}", status.chunk_count)?;
                if let Some(dim) = status.dimension {
                    write!(f, ", dimension: {dim}")?;
                }
                if let Some(path) = &status.index_path {
                    write!(f, ", index: {path}")?;
                }
                write!(
                    f,
                    ", chunking: {}/{}",
                    status.chunk_size, status.chunk_overlap
                )
            }
            Self::RulesAdded { chunks } => {
                write!(f, "Added custom rules: {chunks} new knowledge chunk(s)")
            }
            Self::DocumentReloaded { reloaded: true } => f.write_str("Rules document reloaded"),
            Self::DocumentReloaded { reloaded: false } => {
                f.write_str("Rules document could not be reloaded")
            }
        }
    }
}

/// A review together with the input it was run on.
#[derive(Debug, Clone, Serialize)]
pub struct ImageReview {
    pub text_input: Option<String>,
    pub image_input: Option<String>,
    pub full_input: String,
    pub outcome: ReviewOutcome,
}

impl ImageReview {
    /// Input summary followed by the result table.
    pub fn render(&self) -> String {
        let mut out = String::new();
        if let Some(text) = &self.text_input {
            out.push_str(&format!("Text input: {text}\n"));
        }
        if let Some(image) = &self.image_input {
            out.push_str(&format!("Image input: {image}\n"));
        }
        out.push_str(&format!("Full input: {}\n\n", self.full_input));
        out.push_str(&self.outcome.table());
        out
    }
}

/// Where [`ReviewService::bootstrap`] got its rules from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapSource {
    Snapshot,
    RulesDocument,
    BuiltinDefaults,
}

pub struct ReviewService {
    store: Arc<RuleChunkStore>,
    pipeline: ReviewPipeline,
    extractor: Option<Arc<dyn TextExtractor>>,
    rules_document: Option<PathBuf>,
    ocr_timeout: Duration,
}

impl ReviewService {
    pub fn new(
        store: Arc<RuleChunkStore>,
        completer: Arc<dyn Completer>,
        settings: MatchSettings,
    ) -> Self {
        Self {
            pipeline: ReviewPipeline::new(store.clone(), completer, settings),
            store,
            extractor: None,
            rules_document: None,
            ocr_timeout: Duration::from_secs(60),
        }
    }

    pub fn with_extractor(mut self, extractor: Option<Arc<dyn TextExtractor>>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_rules_document(mut self, path: impl Into<PathBuf>) -> Self {
        self.rules_document = Some(path.into());
        self
    }

    pub fn with_ocr_timeout(mut self, timeout: Duration) -> Self {
        self.ocr_timeout = timeout;
        self
    }

    pub fn store(&self) -> &Arc<RuleChunkStore> {
        &self.store
    }

    /// Bring the knowledge base up: persisted snapshot, then the rules
    /// document, then the built-in rules.
    pub async fn bootstrap(&self) -> Result<BootstrapSource> {
        if self.store.reload().await {
            return Ok(BootstrapSource::Snapshot);
        }
        match self.reload_rule_document().await {
            Ok(true) => return Ok(BootstrapSource::RulesDocument),
            Ok(false) => {}
            Err(e) => tracing::warn!("rules document build failed: {e}"),
        }
        self.store.initialize_default().await?;
        Ok(BootstrapSource::BuiltinDefaults)
    }

    /// Route one operation.
    pub async fn dispatch(&self, operation: Operation) -> Result<OperationOutput> {
        tracing::debug!(?operation, "dispatch");
        match operation {
            Operation::SmartReview { text, image_path } => self
                .review_with_image(&text, image_path.as_deref())
                .await
                .map(OperationOutput::Review),
            Operation::KnowledgeStatus => Ok(OperationOutput::Status(self.store.status().await)),
            Operation::AddCustomRules { rules } => self
                .store
                .add_chunks(&rules)
                .await
                .map(|chunks| OperationOutput::RulesAdded { chunks }),
            Operation::ReloadRuleDocument => self
                .reload_rule_document()
                .await
                .map(|reloaded| OperationOutput::DocumentReloaded { reloaded }),
        }
    }

    /// Review plain text.
    pub async fn review(&self, text: &str) -> Result<ReviewOutcome> {
        self.pipeline.review(text).await
    }

    /// Review text and/or the text found in an image.
    ///
    /// Text and OCR output are joined with one space. An image without
    /// recognizable text, an unsupported image, or no input at all is an
    /// input error.
    pub async fn review_with_image(&self, text: &str, image: Option<&Path>) -> Result<ImageReview> {
        let text = text.trim();
        let mut full_input = text.to_string();

        if let Some(path) = image {
            let image_text = self.extract_image_text(path).await?;
            if image_text.is_empty() {
                return Err(CopyGuardError::EmptyInput(format!(
                    "no text recognized in image {}",
                    path.display()
                )));
            }
            if full_input.is_empty() {
                full_input = image_text;
            } else {
                full_input = format!("{full_input} {image_text}");
            }
        }

        if full_input.trim().is_empty() {
            return Err(CopyGuardError::EmptyInput(
                "no text or image input provided".into(),
            ));
        }

        let outcome = self.pipeline.review(&full_input).await?;
        Ok(ImageReview {
            text_input: (!text.is_empty()).then(|| text.to_string()),
            image_input: image.map(|p| p.display().to_string()),
            full_input,
            outcome,
        })
    }

    async fn extract_image_text(&self, path: &Path) -> Result<String> {
        if !path.exists() {
            return Err(CopyGuardError::FileNotFound(path.display().to_string()));
        }
        let extractor = self.extractor.as_ref().ok_or_else(|| {
            CopyGuardError::Config("image review requires [vision] to be enabled".into())
        })?;
        if !extractor.supports(path) {
            return Err(CopyGuardError::UnsupportedFormat(format!(
                "not a supported image: {}",
                path.display()
            )));
        }
        match bounded(self.ocr_timeout, "extract image text", extractor.extract_text(path)).await {
            Ok(text) => Ok(text.trim().to_string()),
            Err(e) if e.is_transient() => {
                tracing::warn!(path = %path.display(), "image text extraction failed: {e}");
                Ok(String::new())
            }
            Err(e) => Err(e),
        }
    }

    /// Rebuild from the configured rules document.
    ///
    /// `Ok(false)` when no document is configured, it is missing or
    /// unreadable, or it holds no text. Build failures are returned.
    pub async fn reload_rule_document(&self) -> Result<bool> {
        let Some(path) = self.rules_document.clone() else {
            return Ok(false);
        };
        let blocks = self.load_documents(&[path.clone()]).await;
        if blocks.is_empty() {
            tracing::warn!(path = %path.display(), "rules document missing, unreadable or empty");
            return Ok(false);
        }
        self.store.build_from_documents(&blocks).await?;
        Ok(true)
    }

    /// Rebuild from `paths`, skipping files that cannot be read.
    ///
    /// Returns `(documents, chunks)`. Fails with `EmptyInput` when none of
    /// the files yields any text.
    pub async fn build_from_files(&self, paths: &[PathBuf]) -> Result<(usize, usize)> {
        let blocks = self.load_documents(paths).await;
        if blocks.is_empty() {
            return Err(CopyGuardError::EmptyInput(
                "none of the given rule documents could be loaded".into(),
            ));
        }
        let chunks = self.store.build_from_documents(&blocks).await?;
        Ok((blocks.len(), chunks))
    }

    async fn load_documents(&self, paths: &[PathBuf]) -> Vec<TextBlock> {
        load_many(&RuleDocumentLoader, self.extractor.as_deref(), paths).await
    }
}
