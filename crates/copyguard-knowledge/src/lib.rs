//! # CopyGuard Knowledge Base
//!
//! Rule documents are split into overlapping chunks, embedded, and kept in
//! an in-memory similarity index that snapshots to SQLite.
//!
//! ## Flow
//! ```text
//! rules.docx ─load─▶ TextBlock ──split──▶ chunks ──embed──▶ VectorIndex
//!                                                             │
//!                                         knowledge.db ◀──persist / reload
//! ```

pub mod chunker;
pub mod defaults;
pub mod index;
pub mod loader;
pub mod persist;
pub mod store;

pub use chunker::TextSplitter;
pub use defaults::{DEFAULT_RULES, DEFAULT_RULES_SOURCE};
pub use index::VectorIndex;
pub use loader::{DocxLoader, PdfLoader, PlainTextLoader, RuleDocumentLoader, load_many};
pub use store::{KnowledgeStatus, RuleChunkStore};
