//! The rule knowledge base.
//!
//! `RuleChunkStore` owns the similarity index as process-wide shared state.
//! Readers run concurrently; every mutation (build, reload, add, persist)
//! holds the write lock for its whole critical section.
//!
//! Embedding happens before the lock is taken. Inside the critical section
//! there is no `.await`, so cancelling a caller can never leave the index
//! half-updated: the new index is persisted first and swapped in last.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use copyguard_core::config::KnowledgeConfig;
use copyguard_core::deadline::bounded;
use copyguard_core::error::{CopyGuardError, Result};
use copyguard_core::traits::Embedder;
use copyguard_core::types::{RuleChunk, TextBlock};
use serde::Serialize;
use tokio::sync::RwLock;

use crate::chunker::TextSplitter;
use crate::defaults::{DEFAULT_RULES, DEFAULT_RULES_SOURCE};
use crate::index::VectorIndex;
use crate::persist::{load_snapshot, save_snapshot};

/// Source id for rules added through [`RuleChunkStore::add_chunks`].
pub const CUSTOM_RULES_SOURCE: &str = "custom-rules";

/// Snapshot of the store for status reporting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KnowledgeStatus {
    pub initialized: bool,
    pub chunk_count: usize,
    pub dimension: Option<usize>,
    pub index_path: Option<String>,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

pub struct RuleChunkStore {
    embedder: Arc<dyn Embedder>,
    splitter: TextSplitter,
    index_path: Option<PathBuf>,
    embed_timeout: Duration,
    index: RwLock<Option<VectorIndex>>,
}

impl RuleChunkStore {
    /// An empty, uninitialized store without durable storage.
    pub fn new(embedder: Arc<dyn Embedder>, splitter: TextSplitter) -> Self {
        Self {
            embedder,
            splitter,
            index_path: None,
            embed_timeout: Duration::from_secs(30),
            index: RwLock::new(None),
        }
    }

    pub fn from_config(
        embedder: Arc<dyn Embedder>,
        config: &KnowledgeConfig,
        embed_timeout: Duration,
    ) -> Result<Self> {
        let splitter = TextSplitter::new(config.chunk_size, config.chunk_overlap)?;
        Ok(Self::new(embedder, splitter)
            .with_index_path(config.resolved_index_path())
            .with_embed_timeout(embed_timeout))
    }

    /// Persist to (and reload from) this SQLite file.
    pub fn with_index_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.index_path = Some(path.into());
        self
    }

    pub fn with_embed_timeout(mut self, timeout: Duration) -> Self {
        self.embed_timeout = timeout;
        self
    }

    pub fn index_path(&self) -> Option<&Path> {
        self.index_path.as_deref()
    }

    pub async fn is_initialized(&self) -> bool {
        self.index.read().await.is_some()
    }

    /// Split, embed and index `blocks`, replacing the current index.
    ///
    /// Fails with `EmptyInput` when splitting yields no chunk at all.
    pub async fn build_from_documents(&self, blocks: &[TextBlock]) -> Result<usize> {
        let chunks = self.embed_blocks(blocks).await?;
        let index = VectorIndex::from_chunks(chunks)?;
        let count = self.commit(index).await?;
        tracing::info!(
            chunks = count,
            documents = blocks.len(),
            embedder = self.embedder.name(),
            "knowledge base built"
        );
        Ok(count)
    }

    /// Same as [`build_from_documents`](Self::build_from_documents) for one inline document.
    pub async fn build_from_text(&self, text: &str) -> Result<usize> {
        self.build_from_documents(&[TextBlock::new("inline", text)])
            .await
    }

    /// Build from the built-in rule set.
    pub async fn initialize_default(&self) -> Result<usize> {
        tracing::info!("initializing knowledge base from built-in default rules");
        self.build_from_documents(&[TextBlock::new(DEFAULT_RULES_SOURCE, DEFAULT_RULES)])
            .await
    }

    /// Write the current index to the configured path.
    pub async fn persist(&self) -> Result<()> {
        let path = self
            .index_path
            .as_deref()
            .ok_or_else(|| CopyGuardError::Config("no index_path configured".into()))?;
        let guard = self.index.write().await;
        let index = guard
            .as_ref()
            .ok_or(CopyGuardError::KnowledgeBaseUninitialized)?;
        save_snapshot(path, index)?;
        tracing::info!(path = %path.display(), chunks = index.len(), "knowledge base persisted");
        Ok(())
    }

    /// Replace the index with the persisted snapshot.
    ///
    /// Returns `false` and keeps the current state when there is no snapshot
    /// or it cannot be read.
    pub async fn reload(&self) -> bool {
        let Some(path) = self.index_path.as_deref() else {
            return false;
        };
        let mut guard = self.index.write().await;
        match load_snapshot(path) {
            Ok(Some(index)) if !index.is_empty() => {
                tracing::info!(path = %path.display(), chunks = index.len(), "knowledge base reloaded");
                *guard = Some(index);
                true
            }
            Ok(_) => {
                tracing::debug!(path = %path.display(), "no persisted knowledge base");
                false
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), "failed to reload knowledge base: {e}");
                false
            }
        }
    }

    /// Up to `k` chunks most similar to `query_text`, best first.
    ///
    /// An uninitialized store yields an empty list.
    pub async fn search(&self, query_text: &str, k: usize) -> Result<Vec<RuleChunk>> {
        if k == 0 || !self.is_initialized().await {
            return Ok(Vec::new());
        }
        let query = bounded(self.embed_timeout, "embed query", self.embedder.embed(query_text))
            .await?;

        let guard = self.index.read().await;
        let Some(index) = guard.as_ref() else {
            return Ok(Vec::new());
        };
        let hits = index.search(&query, k)?;
        tracing::debug!(k, hits = hits.len(), "rule search");
        Ok(hits.into_iter().map(|(_, chunk)| chunk).collect())
    }

    /// Add rules to the existing index without discarding it, then re-persist.
    pub async fn add_chunks(&self, text: &str) -> Result<usize> {
        if !self.is_initialized().await {
            return Err(CopyGuardError::KnowledgeBaseUninitialized);
        }
        let chunks = self
            .embed_blocks(&[TextBlock::new(CUSTOM_RULES_SOURCE, text)])
            .await?;
        let added = chunks.len();

        let mut guard = self.index.write().await;
        let mut next = guard
            .as_ref()
            .ok_or(CopyGuardError::KnowledgeBaseUninitialized)?
            .clone();
        next.extend(chunks)?;
        if let Some(path) = &self.index_path {
            save_snapshot(path, &next)?;
        }
        tracing::info!(added, total = next.len(), "custom rules added");
        *guard = Some(next);
        Ok(added)
    }

    pub async fn status(&self) -> KnowledgeStatus {
        let guard = self.index.read().await;
        KnowledgeStatus {
            initialized: guard.is_some(),
            chunk_count: guard.as_ref().map(VectorIndex::len).unwrap_or(0),
            dimension: guard.as_ref().and_then(VectorIndex::dimension),
            index_path: self.index_path.as_ref().map(|p| p.display().to_string()),
            chunk_size: self.splitter.chunk_size(),
            chunk_overlap: self.splitter.chunk_overlap(),
        }
    }

    async fn embed_blocks(&self, blocks: &[TextBlock]) -> Result<Vec<RuleChunk>> {
        let mut pieces: Vec<(String, String)> = Vec::new();
        for block in blocks {
            for text in self.splitter.split(&block.text) {
                pieces.push((block.source_id.clone(), text));
            }
        }
        if pieces.is_empty() {
            return Err(CopyGuardError::EmptyInput(
                "no rule text to index after splitting".into(),
            ));
        }

        let texts: Vec<String> = pieces.iter().map(|(_, text)| text.clone()).collect();
        let embeddings = bounded(
            self.embed_timeout,
            "embed rule chunks",
            self.embedder.embed_batch(&texts),
        )
        .await?;
        if embeddings.len() != pieces.len() {
            return Err(CopyGuardError::Provider(format!(
                "embedder returned {} vectors for {} chunks",
                embeddings.len(),
                pieces.len()
            )));
        }

        Ok(pieces
            .into_iter()
            .zip(embeddings)
            .map(|((source_id, text), embedding)| RuleChunk {
                text,
                source_id,
                embedding,
            })
            .collect())
    }

    /// Persist (when configured) and swap in `index`. No await after the lock.
    async fn commit(&self, index: VectorIndex) -> Result<usize> {
        let mut guard = self.index.write().await;
        if let Some(path) = &self.index_path {
            save_snapshot(path, &index)?;
        }
        let count = index.len();
        *guard = Some(index);
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use copyguard_providers::HashEmbedder;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Hash embedder that can be switched to hang on every call.
    struct StallingEmbedder {
        inner: HashEmbedder,
        stall: AtomicBool,
    }

    #[async_trait]
    impl Embedder for StallingEmbedder {
        fn name(&self) -> &str {
            "stalling"
        }

        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            if self.stall.load(Ordering::SeqCst) {
                tokio::time::sleep(Duration::from_secs(10)).await;
            }
            Ok(self.inner.embed_sync(text))
        }
    }

    fn store(dim: usize) -> RuleChunkStore {
        RuleChunkStore::new(Arc::new(HashEmbedder::new(dim)), TextSplitter::default())
    }

    fn temp_db() -> PathBuf {
        std::env::temp_dir().join(format!("copyguard-store-{}.db", uuid::Uuid::new_v4()))
    }

    #[tokio::test]
    async fn test_empty_documents_then_default() {
        let store = store(128);
        let err = store.build_from_documents(&[]).await.unwrap_err();
        assert!(matches!(err, CopyGuardError::EmptyInput(_)));
        assert!(!store.is_initialized().await);

        let count = store.initialize_default().await.unwrap();
        assert!(count >= 1);
        let hits = store.search("根治脱发", 10).await.unwrap();
        assert!(!hits.is_empty());
        assert_eq!(hits[0].source_id, DEFAULT_RULES_SOURCE);
    }

    #[tokio::test]
    async fn test_whitespace_only_text_is_empty_input() {
        let err = store(32).build_from_text("  \n\t ").await.unwrap_err();
        assert!(matches!(err, CopyGuardError::EmptyInput(_)));
    }

    #[tokio::test]
    async fn test_uninitialized_search_is_empty() {
        let hits = store(32).search("anything", 10).await.unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn test_persist_reload_roundtrip() {
        let path = temp_db();
        let original = store(128).with_index_path(&path);
        original.initialize_default().await.unwrap();
        let query = "product: 多肽蓬蓬瓶, text: 修复毛囊";
        let before = original.search(query, 10).await.unwrap();

        let restored = store(128).with_index_path(&path);
        assert!(restored.reload().await);
        let after = restored.search(query, 10).await.unwrap();
        assert_eq!(before, after);
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn test_reload_failure_keeps_state() {
        let missing = store(64).with_index_path(temp_db());
        assert!(!missing.reload().await);
        assert!(!missing.is_initialized().await);

        let no_path = store(64);
        no_path.initialize_default().await.unwrap();
        assert!(!no_path.reload().await);
        assert!(no_path.is_initialized().await);
    }

    #[tokio::test]
    async fn test_corrupt_snapshot_is_rebuilt() {
        let path = temp_db();
        std::fs::write(&path, b"garbage garbage garbage garbage garbage garbage!!").unwrap();
        let store = store(32).with_index_path(&path);
        assert!(!store.reload().await);
        assert!(!store.is_initialized().await);

        let count = store.initialize_default().await.unwrap();
        assert!(store.is_initialized().await);
        assert!(!store.search("根治", 3).await.unwrap().is_empty());

        let restored = self::store(32).with_index_path(&path);
        assert!(restored.reload().await);
        assert_eq!(restored.status().await.chunk_count, count);
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn test_add_chunks_requires_initialized() {
        let store = store(64);
        let err = store.add_chunks("禁止使用“神效”").await.unwrap_err();
        assert!(matches!(err, CopyGuardError::KnowledgeBaseUninitialized));
    }

    #[tokio::test]
    async fn test_add_chunks_extends_and_persists() {
        let path = temp_db();
        let store = store(256).with_index_path(&path);
        let base = store.initialize_default().await.unwrap();

        let added = store.add_chunks("禁止使用“神效焕发”一词").await.unwrap();
        assert_eq!(added, 1);
        assert_eq!(store.status().await.chunk_count, base + 1);

        let hits = store.search("神效焕发", 1).await.unwrap();
        assert_eq!(hits[0].source_id, CUSTOM_RULES_SOURCE);

        let restored = self::store(256).with_index_path(&path);
        assert!(restored.reload().await);
        assert_eq!(restored.status().await.chunk_count, base + 1);
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn test_dimension_mismatch_is_fatal() {
        let path = temp_db();
        let wide = store(64).with_index_path(&path);
        wide.initialize_default().await.unwrap();

        let narrow = store(32).with_index_path(&path);
        assert!(narrow.reload().await);
        let err = narrow.search("根治", 5).await.unwrap_err();
        assert!(matches!(err, CopyGuardError::DimensionMismatch { .. }));
        assert!(!err.is_transient());
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn test_status() {
        let store = store(48);
        let status = store.status().await;
        assert!(!status.initialized);
        assert_eq!(status.chunk_count, 0);
        assert_eq!(status.dimension, None);
        assert_eq!((status.chunk_size, status.chunk_overlap), (1000, 200));

        store.initialize_default().await.unwrap();
        let status = store.status().await;
        assert!(status.initialized);
        assert_eq!(status.dimension, Some(48));
        assert!(status.index_path.is_none());
    }

    #[tokio::test]
    async fn test_concurrent_searches() {
        let store = Arc::new(store(128));
        store.initialize_default().await.unwrap();
        let (a, b) = tokio::join!(store.search("根治", 3), store.search("follicle", 3));
        assert_eq!(a.unwrap().len(), 3.min(store.status().await.chunk_count));
        assert!(!b.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_mutations_leave_index_unchanged() {
        let path = temp_db();
        let embedder = Arc::new(StallingEmbedder {
            inner: HashEmbedder::new(64),
            stall: AtomicBool::new(false),
        });
        let store = RuleChunkStore::new(embedder.clone(), TextSplitter::default())
            .with_index_path(&path);
        store.initialize_default().await.unwrap();
        let before = store.status().await;
        let search_before = store.search("根治", 5).await.unwrap();

        embedder.stall.store(true, Ordering::SeqCst);
        let limit = Duration::from_millis(50);
        let rebuild = tokio::time::timeout(limit, store.build_from_text("全新规则")).await;
        assert!(rebuild.is_err());
        let add = tokio::time::timeout(limit, store.add_chunks("禁止使用“神效”")).await;
        assert!(add.is_err());

        embedder.stall.store(false, Ordering::SeqCst);
        assert_eq!(store.status().await, before);
        assert_eq!(store.search("根治", 5).await.unwrap(), search_before);

        let restored = self::store(64).with_index_path(&path);
        assert!(restored.reload().await);
        assert_eq!(restored.status().await.chunk_count, before.chunk_count);
        let _ = std::fs::remove_file(&path);
    }
}
