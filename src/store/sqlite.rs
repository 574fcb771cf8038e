//! SQLite-based search store implementation.
//!
//! Lexical search uses an FTS5 index with bm25 ranking; vector search keeps
//! embeddings as BLOBs and computes cosine similarity in Rust. For large
//! corpora, consider the sqlite-vec extension or a dedicated vector database.

use super::{
    cosine_similarity, query_terms, rank_and_truncate, ChunkRecord, IndexedSource, ScoredChunk,
    SearchStore,
};
use crate::error::{KildeError, Result};
use crate::source::SourceKind;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info, instrument};

/// SQLite-based search store.
pub struct SqliteSearchStore {
    conn: Mutex<Connection>,
}

impl SqliteSearchStore {
    /// Open or create a search store at the given path.
    #[instrument(skip_all)]
    pub fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        // Enable WAL mode for better concurrent performance
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        Self::init_schema(&conn)?;

        info!("Initialized SQLite search store at {:?}", path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite search store (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS chunks (
                id INTEGER PRIMARY KEY,
                chunk_id TEXT NOT NULL,
                kind TEXT NOT NULL,
                source_id TEXT NOT NULL,
                ordinal INTEGER NOT NULL,
                text TEXT NOT NULL,
                span TEXT NOT NULL,
                embedding BLOB NOT NULL,
                pdf_reference TEXT,
                generation INTEGER NOT NULL,
                indexed_at TEXT NOT NULL,
                UNIQUE(chunk_id, generation)
            );

            CREATE INDEX IF NOT EXISTS idx_chunks_source_id ON chunks(source_id);
            CREATE INDEX IF NOT EXISTS idx_chunks_kind_generation ON chunks(kind, generation);

            CREATE VIRTUAL TABLE IF NOT EXISTS chunks_fts
                USING fts5(text, content='chunks', content_rowid='id');

            CREATE TRIGGER IF NOT EXISTS chunks_fts_insert AFTER INSERT ON chunks BEGIN
                INSERT INTO chunks_fts(rowid, text) VALUES (new.id, new.text);
            END;

            CREATE TRIGGER IF NOT EXISTS chunks_fts_delete AFTER DELETE ON chunks BEGIN
                INSERT INTO chunks_fts(chunks_fts, rowid, text) VALUES ('delete', old.id, old.text);
            END;

            CREATE TRIGGER IF NOT EXISTS chunks_fts_update AFTER UPDATE ON chunks BEGIN
                INSERT INTO chunks_fts(chunks_fts, rowid, text) VALUES ('delete', old.id, old.text);
                INSERT INTO chunks_fts(rowid, text) VALUES (new.id, new.text);
            END;

            CREATE TABLE IF NOT EXISTS generations (
                domain TEXT PRIMARY KEY,
                active INTEGER NOT NULL DEFAULT 0
            );

            INSERT OR IGNORE INTO generations (domain, active) VALUES ('pdf', 0), ('video', 0);
            "#,
        )?;
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| KildeError::Store(format!("failed to acquire lock: {}", e)))
    }

    /// Serialize embedding to bytes.
    fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    /// Deserialize embedding from bytes.
    fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| {
                let arr: [u8; 4] = chunk.try_into().unwrap_or_default();
                f32::from_le_bytes(arr)
            })
            .collect()
    }

    fn record_from_row(row: &Row<'_>) -> rusqlite::Result<ChunkRecord> {
        let kind_str: String = row.get(1)?;
        let span_json: String = row.get(5)?;
        let embedding_bytes: Vec<u8> = row.get(6)?;
        let indexed_at_str: String = row.get(9)?;

        let kind: SourceKind = kind_str.parse().map_err(|e: String| {
            rusqlite::Error::FromSqlConversionFailure(
                1,
                rusqlite::types::Type::Text,
                e.into(),
            )
        })?;
        let span = serde_json::from_str(&span_json).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                5,
                rusqlite::types::Type::Text,
                Box::new(e),
            )
        })?;

        Ok(ChunkRecord {
            chunk_id: row.get(0)?,
            kind,
            source_id: row.get(2)?,
            ordinal: row.get(3)?,
            text: row.get(4)?,
            span,
            embedding: Self::bytes_to_embedding(&embedding_bytes),
            pdf_reference: row.get(7)?,
            generation: row.get::<_, i64>(8)? as u64,
            indexed_at: DateTime::parse_from_rfc3339(&indexed_at_str)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
        })
    }
}

/// Build an FTS5 MATCH expression from free-form query text.
///
/// Terms are quoted so user punctuation never reaches the FTS query parser,
/// and OR-joined so any matching term qualifies a chunk, ranked by bm25.
fn fts_match_expr(query: &str) -> Option<String> {
    let terms = query_terms(query);
    if terms.is_empty() {
        return None;
    }
    Some(
        terms
            .iter()
            .map(|t| format!("\"{}\"", t))
            .collect::<Vec<_>>()
            .join(" OR "),
    )
}

const SELECT_COLUMNS: &str = "c.chunk_id, c.kind, c.source_id, c.ordinal, c.text, c.span, \
     c.embedding, c.pdf_reference, c.generation, c.indexed_at";

#[async_trait]
impl SearchStore for SqliteSearchStore {
    #[instrument(skip(self, record), fields(chunk_id = %record.chunk_id))]
    async fn insert_or_update(&self, record: &ChunkRecord) -> Result<()> {
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;

        tx.execute(
            "DELETE FROM chunks WHERE chunk_id = ?1 AND generation = ?2",
            params![record.chunk_id, record.generation as i64],
        )?;
        tx.execute(
            r#"
            INSERT INTO chunks
            (chunk_id, kind, source_id, ordinal, text, span, embedding, pdf_reference,
             generation, indexed_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
            params![
                record.chunk_id,
                record.kind.to_string(),
                record.source_id,
                record.ordinal,
                record.text,
                serde_json::to_string(&record.span)?,
                Self::embedding_to_bytes(&record.embedding),
                record.pdf_reference,
                record.generation as i64,
                record.indexed_at.to_rfc3339(),
            ],
        )?;
        tx.commit()?;

        debug!("Upserted chunk {}", record.chunk_id);
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete(&self, chunk_id: &str) -> Result<usize> {
        let conn = self.lock()?;
        let deleted = conn.execute(
            r#"
            DELETE FROM chunks
            WHERE chunk_id = ?1
              AND generation = (SELECT active FROM generations WHERE domain = chunks.kind)
            "#,
            params![chunk_id],
        )?;
        Ok(deleted)
    }

    #[instrument(skip(self))]
    async fn search_lexical(&self, query: &str, k: usize) -> Result<Vec<ScoredChunk>> {
        let Some(match_expr) = fts_match_expr(query) else {
            return Ok(Vec::new());
        };

        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            r#"
            SELECT {SELECT_COLUMNS}, bm25(chunks_fts) AS rank
            FROM chunks_fts
            JOIN chunks c ON c.id = chunks_fts.rowid
            JOIN generations g ON g.domain = c.kind AND g.active = c.generation
            WHERE chunks_fts MATCH ?1
            ORDER BY rank ASC, c.chunk_id ASC
            LIMIT ?2
            "#
        ))?;

        let rows = stmt.query_map(params![match_expr, k as i64], |row| {
            let record = Self::record_from_row(row)?;
            let rank: f64 = row.get(10)?;
            // bm25() reports better matches as smaller values; negate so
            // higher is better like the vector side.
            Ok(ScoredChunk {
                record,
                score: -(rank as f32),
            })
        })?;

        let results: Vec<ScoredChunk> = rows.collect::<rusqlite::Result<_>>()?;
        debug!("Lexical search matched {} chunks", results.len());
        Ok(results)
    }

    #[instrument(skip(self, query_embedding))]
    async fn search_vector(&self, query_embedding: &[f32], k: usize) -> Result<Vec<ScoredChunk>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            r#"
            SELECT {SELECT_COLUMNS}
            FROM chunks c
            JOIN generations g ON g.domain = c.kind AND g.active = c.generation
            "#
        ))?;

        let rows = stmt.query_map([], |row| Self::record_from_row(row))?;

        let results: Vec<ScoredChunk> = rows
            .collect::<rusqlite::Result<Vec<_>>>()?
            .into_iter()
            .map(|record| ScoredChunk {
                score: cosine_similarity(query_embedding, &record.embedding),
                record,
            })
            .collect();

        debug!("Vector search scored {} chunks", results.len());
        Ok(rank_and_truncate(results, k))
    }

    async fn count(&self, kind: Option<SourceKind>) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = match kind {
            Some(kind) => conn.query_row(
                r#"
                SELECT COUNT(*) FROM chunks c
                JOIN generations g ON g.domain = c.kind AND g.active = c.generation
                WHERE c.kind = ?1
                "#,
                params![kind.to_string()],
                |row| row.get(0),
            )?,
            None => conn.query_row(
                r#"
                SELECT COUNT(*) FROM chunks c
                JOIN generations g ON g.domain = c.kind AND g.active = c.generation
                "#,
                [],
                |row| row.get(0),
            )?,
        };
        Ok(count as usize)
    }

    async fn active_generation(&self, kind: SourceKind) -> Result<u64> {
        let conn = self.lock()?;
        let active: i64 = conn.query_row(
            "SELECT active FROM generations WHERE domain = ?1",
            params![kind.to_string()],
            |row| row.get(0),
        )?;
        Ok(active as u64)
    }

    #[instrument(skip(self))]
    async fn begin_generation(&self, kind: SourceKind) -> Result<u64> {
        let conn = self.lock()?;
        let active: i64 = conn.query_row(
            "SELECT active FROM generations WHERE domain = ?1",
            params![kind.to_string()],
            |row| row.get(0),
        )?;
        let max_present: i64 = conn.query_row(
            "SELECT COALESCE(MAX(generation), 0) FROM chunks WHERE kind = ?1",
            params![kind.to_string()],
            |row| row.get(0),
        )?;

        let next = active.max(max_present) as u64 + 1;
        debug!("Reserved generation {} for {}", next, kind);
        Ok(next)
    }

    #[instrument(skip(self))]
    async fn activate_generation(&self, kind: SourceKind, generation: u64) -> Result<()> {
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;

        tx.execute(
            "UPDATE generations SET active = ?2 WHERE domain = ?1",
            params![kind.to_string(), generation as i64],
        )?;
        tx.execute(
            "DELETE FROM chunks WHERE kind = ?1 AND generation <> ?2",
            params![kind.to_string(), generation as i64],
        )?;
        tx.commit()?;

        info!("Activated generation {} for {}", generation, kind);
        Ok(())
    }

    async fn source_chunk_ids(&self, source_id: &str) -> Result<Vec<String>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT c.chunk_id FROM chunks c
            JOIN generations g ON g.domain = c.kind AND g.active = c.generation
            WHERE c.source_id = ?1
            ORDER BY c.chunk_id
            "#,
        )?;

        let rows = stmt.query_map(params![source_id], |row| row.get(0))?;
        let ids: Vec<String> = rows.collect::<rusqlite::Result<_>>()?;
        Ok(ids)
    }

    #[instrument(skip(self))]
    async fn list_sources(&self) -> Result<Vec<IndexedSource>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT c.source_id, c.kind, COUNT(*) AS chunk_count,
                   MAX(c.pdf_reference) AS pdf_reference, MAX(c.indexed_at) AS indexed_at
            FROM chunks c
            JOIN generations g ON g.domain = c.kind AND g.active = c.generation
            GROUP BY c.source_id, c.kind
            ORDER BY c.source_id
            "#,
        )?;

        let rows = stmt.query_map([], |row| {
            let kind_str: String = row.get(1)?;
            let indexed_at_str: String = row.get(4)?;
            Ok(IndexedSource {
                source_id: row.get(0)?,
                kind: kind_str.parse().map_err(|e: String| {
                    rusqlite::Error::FromSqlConversionFailure(
                        1,
                        rusqlite::types::Type::Text,
                        e.into(),
                    )
                })?,
                chunk_count: row.get(2)?,
                pdf_reference: row.get(3)?,
                indexed_at: DateTime::parse_from_rfc3339(&indexed_at_str)
                    .map(|dt| dt.with_timezone(&Utc))
                    .unwrap_or_else(|_| Utc::now()),
            })
        })?;

        let result: Vec<IndexedSource> = rows.collect::<rusqlite::Result<_>>()?;
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunking::SourceSpan;

    fn record(kind: SourceKind, source_id: &str, ordinal: u32, text: &str, generation: u64) -> ChunkRecord {
        ChunkRecord {
            chunk_id: crate::chunking::chunk_id(source_id, ordinal),
            kind,
            source_id: source_id.to_string(),
            ordinal,
            text: text.to_string(),
            span: SourceSpan::Pages { first: 1, last: 2 },
            embedding: vec![1.0, 0.0, 0.0],
            pdf_reference: None,
            generation,
            indexed_at: Utc::now(),
        }
    }

    #[test]
    fn test_fts_match_expr_quotes_terms() {
        assert_eq!(
            fts_match_expr("What color is the sky?").as_deref(),
            Some("\"what\" OR \"color\" OR \"is\" OR \"the\" OR \"sky\"")
        );
        assert_eq!(fts_match_expr("?!"), None);
    }

    #[tokio::test]
    async fn test_upsert_and_lexical_search() {
        let store = SqliteSearchStore::in_memory().unwrap();
        store
            .insert_or_update(&record(SourceKind::Pdf, "doc", 0, "The sky is blue.", 0))
            .await
            .unwrap();
        store
            .insert_or_update(&record(SourceKind::Pdf, "doc", 1, "Grass is green.", 0))
            .await
            .unwrap();

        let results = store.search_lexical("sky color?", 10).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].record.chunk_id, "doc#0000");
        assert_eq!(results[0].record.span, SourceSpan::Pages { first: 1, last: 2 });

        // Punctuation-only queries match nothing instead of erroring.
        assert!(store.search_lexical("?!", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_upsert_replaces_same_chunk_id() {
        let store = SqliteSearchStore::in_memory().unwrap();
        store
            .insert_or_update(&record(SourceKind::Pdf, "doc", 0, "old text", 0))
            .await
            .unwrap();
        store
            .insert_or_update(&record(SourceKind::Pdf, "doc", 0, "new text", 0))
            .await
            .unwrap();

        assert_eq!(store.count(None).await.unwrap(), 1);
        let results = store.search_lexical("new", 10).await.unwrap();
        assert_eq!(results.len(), 1);
        assert!(store.search_lexical("old", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_vector_search_ranks_by_similarity() {
        let store = SqliteSearchStore::in_memory().unwrap();
        let mut close = record(SourceKind::Pdf, "a", 0, "first", 0);
        close.embedding = vec![1.0, 0.0, 0.0];
        let mut far = record(SourceKind::Pdf, "b", 0, "second", 0);
        far.embedding = vec![0.0, 1.0, 0.0];
        store.insert_or_update(&close).await.unwrap();
        store.insert_or_update(&far).await.unwrap();

        let results = store.search_vector(&[1.0, 0.0, 0.0], 1).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].record.chunk_id, "a#0000");
        assert!((results[0].score - 1.0).abs() < 0.001);
    }

    #[tokio::test]
    async fn test_generation_swap_is_all_or_nothing() {
        let store = SqliteSearchStore::in_memory().unwrap();
        store
            .insert_or_update(&record(SourceKind::Video, "old_vid", 0, "old spoken words", 0))
            .await
            .unwrap();

        let generation = store.begin_generation(SourceKind::Video).await.unwrap();
        assert_eq!(generation, 1);
        store
            .insert_or_update(&record(SourceKind::Video, "new_vid", 0, "new spoken words", generation))
            .await
            .unwrap();

        // Mid-rebuild reads still see the fully-old generation.
        let results = store.search_lexical("spoken", 10).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].record.source_id, "old_vid");

        store
            .activate_generation(SourceKind::Video, generation)
            .await
            .unwrap();

        let results = store.search_lexical("spoken", 10).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].record.source_id, "new_vid");
        assert_eq!(store.count(Some(SourceKind::Video)).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_delete_and_listings() {
        let store = SqliteSearchStore::in_memory().unwrap();
        store
            .insert_or_update(&record(SourceKind::Pdf, "doc", 0, "a", 0))
            .await
            .unwrap();
        store
            .insert_or_update(&record(SourceKind::Pdf, "doc", 1, "b", 0))
            .await
            .unwrap();
        let mut video = record(SourceKind::Video, "vid", 0, "c", 0);
        video.pdf_reference = Some("doc".to_string());
        store.insert_or_update(&video).await.unwrap();

        assert_eq!(
            store.source_chunk_ids("doc").await.unwrap(),
            vec!["doc#0000", "doc#0001"]
        );

        let sources = store.list_sources().await.unwrap();
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].chunk_count, 2);
        assert_eq!(sources[1].pdf_reference.as_deref(), Some("doc"));

        assert_eq!(store.delete("doc#0001").await.unwrap(), 1);
        assert_eq!(store.count(Some(SourceKind::Pdf)).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.db");

        {
            let store = SqliteSearchStore::new(&path).unwrap();
            store
                .insert_or_update(&record(SourceKind::Pdf, "doc", 0, "persistent text", 0))
                .await
                .unwrap();
        }

        let store = SqliteSearchStore::new(&path).unwrap();
        assert_eq!(store.count(None).await.unwrap(), 1);
        let results = store.search_lexical("persistent", 10).await.unwrap();
        assert_eq!(results.len(), 1);
    }
}
