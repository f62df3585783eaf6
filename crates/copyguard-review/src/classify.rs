//! Structured classification: prompt, expected schema, and parsing of the
//! model's (untrusted) reply.

use copyguard_core::types::{RiskCategory, RuleChunk, Violation};
use serde::Deserialize;
use serde_json::{Value, json};

/// Parsed classifier verdict.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Classification {
    pub violations: Vec<Violation>,
    #[serde(default)]
    pub manual_review_needed: bool,
}

pub fn build_prompt(product_name: &str, text: &str, evidence: &[RuleChunk]) -> String {
    let rules = evidence
        .iter()
        .map(|chunk| chunk.text.as_str())
        .collect::<Vec<_>>()
        .join("\n");
    let categories = RiskCategory::ALL
        .iter()
        .map(|c| c.as_str())
        .collect::<Vec<_>>()
        .join(" / ");

    format!(
        "You are a compliance reviewer for cosmetics and personal-care advertising.\n\
         Check the text against the compliance rules below.\n\n\
         Product name: {product_name}\n\
         Text under review: {text}\n\n\
         Compliance rules:\n{rules}\n\n\
         For every violation report:\n\
         1. hit_word: the offending term as it appears in the text\n\
         2. risk_category: one of {categories}\n\
         3. risk_level: one of absolute-prohibition / warning / advisory\n\
         4. rule_source: the rule reference\n\
         5. brief_description: a short rationale\n\n\
         Reply with JSON only, in this shape:\n\
         {{\"violations\": [{{\"hit_word\": \"\", \"risk_category\": \"\", \"risk_level\": \"\", \
         \"rule_source\": \"\", \"brief_description\": \"\"}}], \"manual_review_needed\": false}}\n\
         If nothing is violated reply {{\"violations\": [], \"manual_review_needed\": false}}."
    )
}

/// JSON schema of [`Classification`], passed to the completer as a hint.
pub fn schema() -> Value {
    let violation = json!({
        "type": "object",
        "properties": {
            "hit_word": { "type": "string" },
            "risk_category": {
                "type": "string",
                "enum": RiskCategory::ALL.iter().map(|c| c.as_str()).collect::<Vec<_>>(),
            },
            "risk_level": {
                "type": "string",
                "enum": ["absolute-prohibition", "warning", "advisory"],
            },
            "rule_source": { "type": "string" },
            "brief_description": { "type": "string" },
        },
        "required": ["hit_word", "risk_category", "risk_level", "rule_source", "brief_description"],
    });
    json!({
        "type": "object",
        "properties": {
            "violations": { "type": "array", "items": violation },
            "manual_review_needed": { "type": "boolean" },
        },
        "required": ["violations", "manual_review_needed"],
    })
}

/// Parse a classifier reply. `None` means the reply is unusable.
///
/// Accepts bare JSON, JSON inside ``` / ```json fences, or JSON surrounded
/// by prose. Labels are canonicalized and all-empty violations dropped.
pub fn parse_classification(raw: &str) -> Option<Classification> {
    let body = strip_fences(raw);
    let parsed = serde_json::from_str::<Classification>(body)
        .ok()
        .or_else(|| {
            let start = body.find('{')?;
            let end = body.rfind('}')?;
            if end <= start {
                return None;
            }
            serde_json::from_str::<Classification>(&body[start..=end]).ok()
        })?;

    Some(Classification {
        violations: parsed
            .violations
            .into_iter()
            .filter(|v| *v != Violation::default())
            .map(Violation::canonicalized)
            .collect(),
        manual_review_needed: parsed.manual_review_needed,
    })
}

fn strip_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let (open, skip) = if let Some(pos) = trimmed.find("```json") {
        (pos, "```json".len())
    } else if let Some(pos) = trimmed.find("```") {
        (pos, 3)
    } else {
        return trimmed;
    };
    let inner = &trimmed[open + skip..];
    match inner.find("```") {
        Some(close) => inner[..close].trim(),
        None => inner.trim(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_json() {
        let raw = r#"{"violations": [{"hit_word": "根治", "risk_category": "绝对化", "risk_level": "绝对禁止",
            "rule_source": "指引 1", "brief_description": "绝对化表述"}], "manual_review_needed": true}"#;
        let c = parse_classification(raw).unwrap();
        assert_eq!(c.violations.len(), 1);
        assert_eq!(c.violations[0].risk_category, "absolute-claim");
        assert_eq!(c.violations[0].risk_level, "absolute-prohibition");
        assert!(c.manual_review_needed);
    }

    #[test]
    fn test_parse_fenced_json() {
        let raw = "Here you go:\n```json\n{\"violations\": [], \"manual_review_needed\": false}\n```\nDone.";
        assert_eq!(parse_classification(raw), Some(Classification::default()));

        let bare_fence = "```\n{\"violations\": []}\n```";
        assert_eq!(parse_classification(bare_fence), Some(Classification::default()));
    }

    #[test]
    fn test_parse_json_in_prose() {
        let raw = "Result: {\"violations\": [{\"hit_word\": \"100%\"}]} hope this helps";
        let c = parse_classification(raw).unwrap();
        assert_eq!(c.violations[0].hit_word, "100%");
        assert!(c.violations[0].risk_level.is_empty());
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(parse_classification("I cannot help with that").is_none());
        assert!(parse_classification("{\"violations\": \"none\"}").is_none());
        assert!(parse_classification("{\"manual_review_needed\": true}").is_none());
        assert!(parse_classification("} backwards {").is_none());
        assert!(parse_classification("").is_none());
    }

    #[test]
    fn test_all_empty_violation_dropped() {
        let c = parse_classification("{\"violations\": [{}], \"manual_review_needed\": false}").unwrap();
        assert!(c.violations.is_empty());
    }

    #[test]
    fn test_prompt_includes_evidence() {
        let evidence = vec![RuleChunk {
            text: "禁止宣称修复毛囊".into(),
            source_id: "rules.md".into(),
            embedding: vec![1.0],
        }];
        let prompt = build_prompt("多肽蓬蓬瓶", "修复毛囊", &evidence);
        assert!(prompt.contains("禁止宣称修复毛囊"));
        assert!(prompt.contains("多肽蓬蓬瓶"));
        assert!(prompt.contains("medical-term"));
    }

    #[test]
    fn test_schema_lists_categories() {
        let s = schema();
        let categories = &s["properties"]["violations"]["items"]["properties"]["risk_category"]["enum"];
        assert_eq!(categories.as_array().unwrap().len(), 4);
    }
}
