//! Rule matching: retrieve evidence, classify, fall back when needed.

use std::sync::Arc;
use std::time::Duration;

use copyguard_core::config::CopyGuardConfig;
use copyguard_core::deadline::bounded;
use copyguard_core::error::Result;
use copyguard_core::traits::{CompletionRequest, Completer};
use copyguard_core::types::{ComplianceResult, Query};
use copyguard_knowledge::RuleChunkStore;

use crate::classify::{self, Classification};
use crate::fallback;

/// Tunables for one matcher.
#[derive(Debug, Clone)]
pub struct MatchSettings {
    pub search_k: usize,
    pub timeout: Duration,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for MatchSettings {
    fn default() -> Self {
        Self {
            search_k: 10,
            timeout: Duration::from_secs(30),
            temperature: 0.1,
            max_tokens: 1024,
        }
    }
}

impl MatchSettings {
    pub fn from_config(config: &CopyGuardConfig) -> Self {
        Self {
            search_k: config.knowledge.search_k,
            timeout: config.llm.timeout(),
            temperature: config.llm.temperature,
            max_tokens: config.llm.max_tokens,
        }
    }
}

pub struct RuleMatcher {
    store: Arc<RuleChunkStore>,
    completer: Arc<dyn Completer>,
    settings: MatchSettings,
}

impl RuleMatcher {
    pub fn new(
        store: Arc<RuleChunkStore>,
        completer: Arc<dyn Completer>,
        settings: MatchSettings,
    ) -> Self {
        Self {
            store,
            completer,
            settings,
        }
    }

    /// Review `text` against the rules most similar to it.
    ///
    /// The returned list is never empty: no evidence, or no violation,
    /// yields exactly one pass row. Service failures degrade to the keyword
    /// classifier; only non-transient errors (e.g. an embedding dimension
    /// mismatch) are returned.
    pub async fn match_rules(&self, text: &str, product_name: &str) -> Result<Vec<ComplianceResult>> {
        let query = Query::new(product_name, text).to_query_text();
        let evidence = match self.store.search(&query, self.settings.search_k).await {
            Ok(evidence) => evidence,
            Err(e) if e.is_transient() => {
                tracing::warn!("rule retrieval failed, using keyword fallback: {e}");
                return Ok(to_results(product_name, text, fallback::classify(text)));
            }
            Err(e) => return Err(e),
        };

        if evidence.is_empty() {
            tracing::debug!("no rule evidence retrieved");
            return Ok(vec![ComplianceResult::pass(product_name, text, false)]);
        }

        let request = CompletionRequest::new(classify::build_prompt(product_name, text, &evidence))
            .with_schema(classify::schema())
            .with_temperature(self.settings.temperature)
            .with_max_tokens(self.settings.max_tokens);

        let classification =
            match bounded(self.settings.timeout, "classify", self.completer.complete(&request)).await {
                Ok(raw) => match classify::parse_classification(&raw) {
                    Some(parsed) => parsed,
                    None => {
                        tracing::warn!("unparseable classifier reply, using keyword fallback");
                        tracing::debug!(reply = %raw, "classifier reply");
                        fallback::classify(text)
                    }
                },
                Err(e) if e.is_transient() => {
                    tracing::warn!("classification failed, using keyword fallback: {e}");
                    fallback::classify(text)
                }
                Err(e) => return Err(e),
            };

        Ok(to_results(product_name, text, classification))
    }
}

/// One reject row per violation, in classifier order; one pass row if none.
fn to_results(product_name: &str, text: &str, classification: Classification) -> Vec<ComplianceResult> {
    let Classification {
        violations,
        manual_review_needed,
    } = classification;
    if violations.is_empty() {
        return vec![ComplianceResult::pass(product_name, text, manual_review_needed)];
    }
    violations
        .into_iter()
        .map(|v| ComplianceResult::reject(product_name, text, v, manual_review_needed))
        .collect()
}
