//! # CopyGuard Review
//!
//! Checks promotional copy against the rule knowledge base.
//!
//! ## Flow
//! ```text
//! text ──normalize──▶ product name ──▶ retrieve rules ──▶ classify ──▶ table
//!                                          │                 │
//!                                          └── on failure ───┴──▶ keyword fallback
//! ```
//!
//! [`ReviewService`] fronts everything with the four user-facing
//! operations: smart review, knowledge status, custom rules, and rules
//! document reload.

pub mod classify;
pub mod fallback;
pub mod format;
pub mod matcher;
pub mod normalizer;
pub mod operations;
pub mod pipeline;
pub mod product;

#[cfg(test)]
mod testing;

pub use format::format_table;
pub use matcher::{MatchSettings, RuleMatcher};
pub use normalizer::normalize;
pub use operations::{BootstrapSource, ImageReview, Operation, OperationOutput, ReviewService};
pub use pipeline::{ReviewOutcome, ReviewPipeline};
pub use product::ProductNameExtractor;
