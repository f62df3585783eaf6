//! Product name extraction.

use std::sync::Arc;
use std::time::Duration;

use copyguard_core::deadline::bounded;
use copyguard_core::traits::{CompletionRequest, Completer};

/// Reply meaning "no product name found".
const NOT_FOUND: &[&str] = &["未识别", "not found", "none", "无"];

/// Characters stripped from the model's reply.
const QUOTES: &[char] = &['"', '\'', '“', '”', '‘', '’', '`'];

fn build_prompt(text: &str) -> String {
    format!(
        "请从以下文本中提取产品名称。产品名称通常出现在方括号【】中，或者是文本开头的主要产品标识。\n\n\
         文本：{text}\n\n\
         请只返回产品名称，如果没有找到产品名称，返回\"未识别\"。\n\n\
         产品名称："
    )
}

/// Asks the completion service for the product a piece of copy promotes.
pub struct ProductNameExtractor {
    completer: Arc<dyn Completer>,
    timeout: Duration,
}

impl ProductNameExtractor {
    pub fn new(completer: Arc<dyn Completer>, timeout: Duration) -> Self {
        Self { completer, timeout }
    }

    /// Product name, or an empty string when none is found.
    ///
    /// Never fails: any service error counts as "no product name".
    pub async fn extract(&self, text: &str) -> String {
        if text.trim().is_empty() {
            return String::new();
        }
        let request = CompletionRequest::new(build_prompt(text)).with_max_tokens(64);
        match bounded(self.timeout, "extract product name", self.completer.complete(&request)).await {
            Ok(raw) => clean_reply(&raw),
            Err(e) => {
                tracing::warn!("product name extraction failed: {e}");
                String::new()
            }
        }
    }
}

fn clean_reply(raw: &str) -> String {
    let first_line = raw.trim().lines().next().unwrap_or_default();
    let name = first_line
        .trim_start_matches("产品名称：")
        .trim_start_matches("产品名称:")
        .replace(QUOTES, "");
    let name = name.trim();
    if NOT_FOUND.iter().any(|s| name.eq_ignore_ascii_case(s)) {
        String::new()
    } else {
        name.to_string()
    }
}
