//! Core data types shared across CopyGuard.

use serde::{Deserialize, Serialize};

/// A raw block of text produced by a document loader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextBlock {
    /// Opaque origin label (file path, page, "inline", ...).
    pub source_id: String,
    pub text: String,
}

impl TextBlock {
    pub fn new(source_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            text: text.into(),
        }
    }
}

/// One indexed fragment of a rule document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleChunk {
    pub text: String,
    pub source_id: String,
    pub embedding: Vec<f32>,
}

/// Retrieval query: the extracted product name plus the reviewed text.
#[derive(Debug, Clone, Copy)]
pub struct Query<'a> {
    pub product_name: &'a str,
    pub text: &'a str,
}

impl<'a> Query<'a> {
    pub fn new(product_name: &'a str, text: &'a str) -> Self {
        Self { product_name, text }
    }

    /// Flatten into the single string handed to the embedder.
    pub fn to_query_text(&self) -> String {
        format!("product: {}, text: {}", self.product_name, self.text)
    }
}

/// Risk category taxonomy used by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RiskCategory {
    AbsoluteClaim,
    MedicalTerm,
    ScopeOverreach,
    ProductSpecificBan,
}

impl RiskCategory {
    pub const ALL: [RiskCategory; 4] = [
        Self::AbsoluteClaim,
        Self::MedicalTerm,
        Self::ScopeOverreach,
        Self::ProductSpecificBan,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AbsoluteClaim => "absolute-claim",
            Self::MedicalTerm => "medical-term",
            Self::ScopeOverreach => "scope-overreach",
            Self::ProductSpecificBan => "product-specific-ban",
        }
    }

    /// Accepts canonical identifiers and the Chinese labels used in rule documents.
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "absolute-claim" | "absolute_claim" | "absolute claim" | "绝对化" => {
                Some(Self::AbsoluteClaim)
            }
            "medical-term" | "medical_term" | "medical term" | "医疗术语" => {
                Some(Self::MedicalTerm)
            }
            "scope-overreach" | "scope_overreach" | "scope overreach" | "超范围" => {
                Some(Self::ScopeOverreach)
            }
            "product-specific-ban" | "product_specific_ban" | "product specific ban"
            | "产品专属禁用" => Some(Self::ProductSpecificBan),
            _ => None,
        }
    }
}

/// Severity of a violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RiskLevel {
    AbsoluteProhibition,
    Warning,
    Advisory,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AbsoluteProhibition => "absolute-prohibition",
            Self::Warning => "warning",
            Self::Advisory => "advisory",
        }
    }

    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "absolute-prohibition" | "absolute_prohibition" | "absolute prohibition"
            | "绝对禁止" => Some(Self::AbsoluteProhibition),
            "warning" | "警告" => Some(Self::Warning),
            "advisory" | "灰色提醒" => Some(Self::Advisory),
            _ => None,
        }
    }
}

/// One specific rule infraction found in the reviewed text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Violation {
    pub hit_word: String,
    pub risk_category: String,
    pub risk_level: String,
    pub rule_source: String,
    pub brief_description: String,
}

impl Violation {
    /// Map known taxonomy labels onto canonical identifiers; unknown labels stay verbatim.
    pub fn canonicalized(mut self) -> Self {
        if let Some(category) = RiskCategory::parse(&self.risk_category) {
            self.risk_category = category.as_str().to_string();
        }
        if let Some(level) = RiskLevel::parse(&self.risk_level) {
            self.risk_level = level.as_str().to_string();
        }
        self
    }
}

/// Verdict of one review row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewVerdict {
    Pass,
    Reject,
}

impl ReviewVerdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pass => "pass",
            Self::Reject => "reject",
        }
    }
}

impl std::fmt::Display for ReviewVerdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of a review outcome.
///
/// The verdict is derived from the presence of a violation, so a reject
/// without a violation (or the reverse) cannot be constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComplianceResult {
    pub category: String,
    pub original_text: String,
    pub violation: Option<Violation>,
    pub manual_review_needed: bool,
}

impl ComplianceResult {
    pub fn pass(
        category: impl Into<String>,
        original_text: impl Into<String>,
        manual_review_needed: bool,
    ) -> Self {
        Self {
            category: category.into(),
            original_text: original_text.into(),
            violation: None,
            manual_review_needed,
        }
    }

    pub fn reject(
        category: impl Into<String>,
        original_text: impl Into<String>,
        violation: Violation,
        manual_review_needed: bool,
    ) -> Self {
        Self {
            category: category.into(),
            original_text: original_text.into(),
            violation: Some(violation),
            manual_review_needed,
        }
    }

    pub fn review_result(&self) -> ReviewVerdict {
        if self.violation.is_some() {
            ReviewVerdict::Reject
        } else {
            ReviewVerdict::Pass
        }
    }

    pub fn is_reject(&self) -> bool {
        self.violation.is_some()
    }
}
