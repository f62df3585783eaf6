//! End-to-end review of one piece of text.

use std::sync::Arc;

use copyguard_core::error::{CopyGuardError, Result};
use copyguard_core::traits::Completer;
use copyguard_core::types::ComplianceResult;
use copyguard_knowledge::RuleChunkStore;
use serde::Serialize;

use crate::format::format_table;
use crate::matcher::{MatchSettings, RuleMatcher};
use crate::normalizer::normalize;
use crate::product::ProductNameExtractor;

/// Everything one review produced.
#[derive(Debug, Clone, Serialize)]
pub struct ReviewOutcome {
    pub normalized_text: String,
    pub product_name: String,
    pub results: Vec<ComplianceResult>,
}

impl ReviewOutcome {
    pub fn has_violations(&self) -> bool {
        self.results.iter().any(ComplianceResult::is_reject)
    }

    pub fn table(&self) -> String {
        format_table(&self.results)
    }
}

/// normalize → product name → match.
pub struct ReviewPipeline {
    store: Arc<RuleChunkStore>,
    products: ProductNameExtractor,
    matcher: RuleMatcher,
}

impl ReviewPipeline {
    pub fn new(
        store: Arc<RuleChunkStore>,
        completer: Arc<dyn Completer>,
        settings: MatchSettings,
    ) -> Self {
        let products = ProductNameExtractor::new(completer.clone(), settings.timeout);
        let matcher = RuleMatcher::new(store.clone(), completer, settings);
        Self {
            store,
            products,
            matcher,
        }
    }

    /// Fails with `KnowledgeBaseUninitialized` before touching any service
    /// when no rules have been loaded.
    pub async fn review(&self, text: &str) -> Result<ReviewOutcome> {
        if !self.store.is_initialized().await {
            return Err(CopyGuardError::KnowledgeBaseUninitialized);
        }
        let normalized_text = normalize(text);
        let product_name = self.products.extract(&normalized_text).await;
        tracing::debug!(product = %product_name, "reviewing text");
        let results = self.matcher.match_rules(&normalized_text, &product_name).await?;
        tracing::info!(
            rows = results.len(),
            rejected = results.iter().filter(|r| r.is_reject()).count(),
            "review finished"
        );
        Ok(ReviewOutcome {
            normalized_text,
            product_name,
            results,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedCompleter;
    use copyguard_core::types::ReviewVerdict;
    use copyguard_knowledge::TextSplitter;
    use copyguard_providers::HashEmbedder;

    async fn pipeline(product: Option<&str>, classify: Option<&str>) -> ReviewPipeline {
        let store = RuleChunkStore::new(Arc::new(HashEmbedder::new(128)), TextSplitter::default());
        store.initialize_default().await.unwrap();
        ReviewPipeline::new(
            Arc::new(store),
            Arc::new(ScriptedCompleter::new(product, classify)),
            MatchSettings::default(),
        )
    }

    #[tokio::test]
    async fn test_scenario_cure_and_follicle_rejected() {
        let p = pipeline(Some("多肽蓬蓬瓶"), Some("not json")).await;
        let outcome = p.review("【多肽蓬蓬瓶】本产品能根治脱发并修复毛囊").await.unwrap();
        assert!(outcome.results.len() >= 2);
        let hits: Vec<&str> = outcome
            .results
            .iter()
            .filter_map(|r| r.violation.as_ref())
            .map(|v| v.hit_word.as_str())
            .collect();
        assert!(hits.contains(&"根治"));
        assert!(hits.contains(&"毛囊"));
        for result in &outcome.results {
            assert_eq!(result.review_result(), ReviewVerdict::Reject);
            assert_eq!(result.violation.as_ref().unwrap().risk_level, "absolute-prohibition");
            assert_eq!(result.category, "多肽蓬蓬瓶");
        }
        assert!(outcome.table().lines().next().unwrap().contains("Hit term"));
    }

    #[tokio::test]
    async fn test_scenario_gentle_copy_passes() {
        let p = pipeline(Some("未识别"), Some("not json")).await;
        let outcome = p.review("温和清洁，呵护秀发健康").await.unwrap();
        assert_eq!(outcome.results.len(), 1);
        assert!(!outcome.has_violations());
        assert_eq!(outcome.product_name, "");
        let table = outcome.table();
        let header = table.lines().next().unwrap();
        assert_eq!(header, "| Category | Original text | Verdict |");
        assert_eq!(table.lines().count(), 3);
    }

    #[tokio::test]
    async fn test_input_is_normalized() {
        let p = pipeline(None, Some("{\"violations\": []}")).await;
        let outcome = p.review("  ［Limited］ ＯＦＦＥＲ  ").await.unwrap();
        assert_eq!(outcome.normalized_text, "limited offer");
        assert_eq!(outcome.results[0].original_text, "limited offer");
    }

    #[tokio::test]
    async fn test_uninitialized_store_is_error() {
        let store = RuleChunkStore::new(Arc::new(HashEmbedder::new(32)), TextSplitter::default());
        let completer = Arc::new(ScriptedCompleter::new(Some("x"), Some("{}")));
        let p = ReviewPipeline::new(Arc::new(store), completer.clone(), MatchSettings::default());
        let err = p.review("根治").await.unwrap_err();
        assert!(matches!(err, CopyGuardError::KnowledgeBaseUninitialized));
        assert_eq!(completer.calls(), 0);
    }

    #[tokio::test]
    async fn test_empty_text_still_yields_row() {
        let p = pipeline(None, None).await;
        let outcome = p.review("").await.unwrap();
        assert_eq!(outcome.results.len(), 1);
    }
}
