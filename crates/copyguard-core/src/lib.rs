//! # CopyGuard Core
//!
//! Shared foundation for the CopyGuard review pipeline.
//!
//! ## Contents
//! - **types** — rule chunks, violations, per-row review results
//! - **traits** — the remote-service seams (`Embedder`, `Completer`,
//!   `TextExtractor`) and the local `DocumentLoader`
//! - **config** — TOML configuration with per-field defaults
//! - **error** — the single error type every crate returns
//! - **deadline** — request-level timeouts around service calls

pub mod config;
pub mod deadline;
pub mod error;
pub mod traits;
pub mod types;

pub use config::CopyGuardConfig;
pub use error::{CopyGuardError, Result};
