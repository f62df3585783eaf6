//! Keyword classifier used when the model's reply cannot be parsed.
//!
//! A best-effort approximation of the rule set, not a source of truth: the
//! term lists cover only the most common prohibited claims.

use copyguard_core::types::{RiskCategory, RiskLevel, Violation};

use crate::classify::Classification;
use crate::normalizer::normalize;

pub const ABSOLUTE_CLAIM_TERMS: &[&str] = &[
    "根治", "彻底", "立竿见影", "百分之百", "完全", "绝对", "全方位", "全面", "顶级", "最",
    "第一", "瞬间", "永不",
    "completely cures", "100%", "instant", "guaranteed", "absolute",
];

pub const MEDICAL_TERMS: &[&str] = &[
    "毛囊", "修复", "治疗", "除菌", "抗菌", "排毒", "活化", "颠覆", "逆转", "药用", "消炎",
    "抗敏",
    "follicle", "treatment", "cure", "anti-inflammatory", "prescription",
];

pub const FALLBACK_RULE_SOURCE: &str = "guideline 1: core regulations and general prohibitions";

/// Scan `text` for known terms. Order: absolute-claim list, then medical
/// list, each in list order. Never flags for manual review.
pub fn classify(text: &str) -> Classification {
    let haystack = normalize(text);
    let mut violations = Vec::new();

    for (terms, category, label) in [
        (ABSOLUTE_CLAIM_TERMS, RiskCategory::AbsoluteClaim, "absolute claim"),
        (MEDICAL_TERMS, RiskCategory::MedicalTerm, "medical term"),
    ] {
        for term in terms {
            if haystack.contains(normalize(term).as_str()) {
                violations.push(Violation {
                    hit_word: (*term).to_string(),
                    risk_category: category.as_str().to_string(),
                    risk_level: RiskLevel::AbsoluteProhibition.as_str().to_string(),
                    rule_source: FALLBACK_RULE_SOURCE.to_string(),
                    brief_description: format!("uses {label}: {term}"),
                });
            }
        }
    }

    Classification {
        violations,
        manual_review_needed: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_absolute_claim() {
        let c = classify("guaranteed results");
        assert_eq!(c.violations.len(), 1);
        assert_eq!(c.violations[0].hit_word, "guaranteed");
        assert_eq!(c.violations[0].risk_category, "absolute-claim");
        assert_eq!(c.violations[0].risk_level, "absolute-prohibition");
        assert!(!c.manual_review_needed);
    }

    #[test]
    fn test_case_and_width_insensitive() {
        let c = classify("ＧＵＡＲＡＮＴＥＥＤ ＦＯＬＬＩＣＬＥ care");
        let hits: Vec<&str> = c.violations.iter().map(|v| v.hit_word.as_str()).collect();
        assert_eq!(hits, vec!["guaranteed", "follicle"]);
    }

    #[test]
    fn test_list_order_preserved() {
        let c = classify("本产品能根治脱发并修复毛囊");
        let hits: Vec<&str> = c.violations.iter().map(|v| v.hit_word.as_str()).collect();
        assert_eq!(hits, vec!["根治", "毛囊", "修复"]);
    }

    #[test]
    fn test_clean_text_has_no_hits() {
        assert!(classify("温和清洁，呵护秀发健康").violations.is_empty());
        assert!(classify("").violations.is_empty());
    }

    #[test]
    fn test_deterministic() {
        let text = "100% 有效，彻底解决 treatment";
        assert_eq!(classify(text), classify(text));
    }
}
