//! Test doubles shared by this crate's unit tests.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use copyguard_core::error::{CopyGuardError, Result};
use copyguard_core::traits::{CompletionRequest, Completer, TextExtractor};

/// Replies with canned text. Requests carrying a schema are classification
/// calls; the rest are product-name calls. `None` simulates a service failure.
pub struct ScriptedCompleter {
    product: Option<String>,
    classify: Option<String>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl ScriptedCompleter {
    pub fn new(product: Option<&str>, classify: Option<&str>) -> Self {
        Self {
            product: product.map(String::from),
            classify: classify.map(String::from),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Completer for ScriptedCompleter {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let reply = if request.schema.is_some() {
            &self.classify
        } else {
            &self.product
        };
        reply
            .clone()
            .ok_or_else(|| CopyGuardError::Provider("scripted failure".into()))
    }
}

/// OCR double returning fixed text for any supported path.
pub struct FixedExtractor(pub String);

#[async_trait]
impl TextExtractor for FixedExtractor {
    fn name(&self) -> &str {
        "fixed"
    }

    async fn extract_text(&self, image: &Path) -> Result<String> {
        if !image.exists() {
            return Err(CopyGuardError::FileNotFound(image.display().to_string()));
        }
        Ok(self.0.clone())
    }
}
