//! SQLite snapshots of the similarity index.
//!
//! One file holds exactly one snapshot. A save writes a fresh database next
//! to the target and renames it into place, so a crash mid-save leaves the
//! old snapshot intact and an unreadable old file never blocks a new save.

use std::path::{Path, PathBuf};

use copyguard_core::error::{CopyGuardError, Result};
use copyguard_core::types::RuleChunk;
use rusqlite::{Connection, OptionalExtension, params};

use crate::index::VectorIndex;

const FORMAT_VERSION: &str = "1";

fn db_err(e: rusqlite::Error) -> CopyGuardError {
    CopyGuardError::Persistence(e.to_string())
}

fn open(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path).map_err(db_err)?;
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS index_meta (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS rule_chunks (
            ordinal INTEGER PRIMARY KEY,
            source_id TEXT NOT NULL,
            text TEXT NOT NULL,
            embedding BLOB NOT NULL,
            dim INTEGER NOT NULL
        );",
    )
    .map_err(db_err)?;
    Ok(conn)
}

/// Write `index` to `path`, replacing any earlier snapshot.
pub fn save_snapshot(path: &Path, index: &VectorIndex) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let staging = staging_path(path);
    if staging.exists() {
        std::fs::remove_file(&staging)?;
    }
    if let Err(e) = write_snapshot(&staging, index) {
        let _ = std::fs::remove_file(&staging);
        return Err(e);
    }
    std::fs::rename(&staging, path)?;
    tracing::debug!(path = %path.display(), chunks = index.len(), "index snapshot saved");
    Ok(())
}

/// `knowledge.db` -> `knowledge.db.tmp`, in the same directory.
fn staging_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "snapshot".into());
    name.push(".tmp");
    path.with_file_name(name)
}

fn write_snapshot(path: &Path, index: &VectorIndex) -> Result<()> {
    let mut conn = open(path)?;
    let tx = conn.transaction().map_err(db_err)?;

    let dimension = index.dimension().unwrap_or(0).to_string();
    let saved_at = chrono::Utc::now().to_rfc3339();
    for (key, value) in [
        ("format_version", FORMAT_VERSION),
        ("dimension", dimension.as_str()),
        ("saved_at", saved_at.as_str()),
    ] {
        tx.execute(
            "INSERT INTO index_meta (key, value) VALUES (?1, ?2)",
            params![key, value],
        )
        .map_err(db_err)?;
    }

    {
        let mut stmt = tx
            .prepare(
                "INSERT INTO rule_chunks (ordinal, source_id, text, embedding, dim)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )
            .map_err(db_err)?;
        for (ordinal, chunk) in index.chunks().iter().enumerate() {
            stmt.execute(params![
                ordinal as i64,
                chunk.source_id,
                chunk.text,
                encode_embedding(&chunk.embedding),
                chunk.embedding.len() as i64,
            ])
            .map_err(db_err)?;
        }
    }

    tx.commit().map_err(db_err)?;
    conn.close().map_err(|(_, e)| db_err(e))
}

/// Read the snapshot at `path`. `Ok(None)` when the file does not exist.
///
/// Any structural problem (unknown format, bad blob, dimension drift) is a
/// `Persistence` error.
pub fn load_snapshot(path: &Path) -> Result<Option<VectorIndex>> {
    if !path.exists() {
        return Ok(None);
    }
    let conn = open(path)?;

    let version: Option<String> = conn
        .query_row(
            "SELECT value FROM index_meta WHERE key = 'format_version'",
            [],
            |row| row.get(0),
        )
        .optional()
        .map_err(db_err)?;
    match version.as_deref() {
        Some(FORMAT_VERSION) => {}
        Some(other) => {
            return Err(CopyGuardError::Persistence(format!(
                "unsupported snapshot format version {other}"
            )));
        }
        None => {
            return Err(CopyGuardError::Persistence(
                "snapshot has no format version".into(),
            ));
        }
    }

    let mut stmt = conn
        .prepare("SELECT source_id, text, embedding, dim FROM rule_chunks ORDER BY ordinal")
        .map_err(db_err)?;
    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Vec<u8>>(2)?,
                row.get::<_, i64>(3)?,
            ))
        })
        .map_err(db_err)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(db_err)?;

    let mut index = VectorIndex::new();
    for (source_id, text, blob, dim) in rows {
        let embedding = decode_embedding(&blob, dim as usize).ok_or_else(|| {
            CopyGuardError::Persistence(format!("corrupt embedding blob for '{source_id}'"))
        })?;
        index
            .insert(RuleChunk {
                text,
                source_id,
                embedding,
            })
            .map_err(|e| CopyGuardError::Persistence(e.to_string()))?;
    }
    Ok(Some(index))
}

/// f32 little-endian.
fn encode_embedding(values: &[f32]) -> Vec<u8> {
    values.iter().flat_map(|f| f.to_le_bytes()).collect()
}

fn decode_embedding(blob: &[u8], expected_dim: usize) -> Option<Vec<f32>> {
    if expected_dim == 0 || blob.len() != expected_dim.saturating_mul(4) {
        return None;
    }
    Some(
        blob.chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect(),
    )
}
