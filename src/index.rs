//! Persistent embedding index over document chunks.
//!
//! Each chunk is stored as one row of `chunk_records` in
//! `<persist_dir>/index.sqlite`, together with its embedding (a little-endian
//! f32 BLOB) and the name and dimensionality of the model that produced it.
//! Search is an exact nearest-neighbour scan in cosine distance.
//!
//! # Writes
//!
//! [`EmbeddingIndex::add`] flushes records in batches of [`ADD_BATCH_SIZE`].
//! Each batch is embedded and then written in its own transaction, so a
//! failing batch leaves earlier batches committed. Store keys are fresh
//! UUIDs, so adding the same document twice stores two record sets.
//!
//! # Search
//!
//! Only rows embedded by the index's own model (same name and dims) are
//! compared with the query. Results are ordered by ascending distance, ties
//! broken by insertion order, and scored with
//! [`distance_to_score`](docsift_core::embedding::distance_to_score).
//!
//! # Errors
//!
//! Every operation logs its failure with `tracing::error!` before returning
//! an [`IndexError`].

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use docsift_core::embedding::{blob_to_vec, cosine_distance, distance_to_score, vec_to_blob, Embedder};
use docsift_core::models::{DocType, Document, DocumentChunk, DocumentMetadata, SearchResult};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqliteConnection, SqlitePool};
use thiserror::Error;
use uuid::Uuid;

use crate::config::IndexConfig;
use crate::{db, migrate};

/// Records embedded and written per transaction by [`EmbeddingIndex::add`].
pub const ADD_BATCH_SIZE: usize = 100;

/// Metadata keys rebuilt into [`DocumentMetadata`] fields rather than `custom_metadata`.
const DOCUMENT_KEYS: [&str; 4] = ["doc_id", "title", "doc_type", "upload_date"];

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("store error: {0}")]
    Store(#[from] sqlx::Error),
    #[error("embedding failed: {0}")]
    Embedding(String),
    #[error("embedder returned {got} vectors of {got_dims} dims, expected {expected} of {expected_dims}")]
    ModelMismatch {
        expected: usize,
        expected_dims: usize,
        got: usize,
        got_dims: usize,
    },
}

/// Column for a filter key, or `None` for keys that are not filterable.
fn filter_column(key: &str) -> Option<&'static str> {
    match key {
        "doc_id" => Some("doc_id"),
        "title" => Some("title"),
        "doc_type" => Some("doc_type"),
        "page_number" => Some("page_number"),
        _ => None,
    }
}

struct PendingRecord {
    id: String,
    doc_id: String,
    title: String,
    doc_type: String,
    page_number: String,
    chunk_index: i64,
    content: String,
    hash: String,
    metadata_json: String,
}

pub struct EmbeddingIndex {
    pool: SqlitePool,
    collection: String,
    embedder: Arc<dyn Embedder>,
}

impl EmbeddingIndex {
    /// Open the index in `config.persist_dir`, creating the schema if needed.
    pub async fn open(config: &IndexConfig, embedder: Arc<dyn Embedder>) -> anyhow::Result<Self> {
        let pool = db::connect(&config.persist_dir).await?;
        migrate::run_migrations(&pool).await?;
        Ok(Self::new(pool, config.collection.clone(), embedder))
    }

    pub fn new(pool: SqlitePool, collection: String, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            pool,
            collection,
            embedder,
        }
    }

    pub fn embedder(&self) -> &dyn Embedder {
        self.embedder.as_ref()
    }

    /// Store every chunk of `document`. Returns the number of records written.
    pub async fn add(&self, document: &Document) -> Result<usize, IndexError> {
        let records = build_records(document);
        let mut written = 0;

        for batch in records.chunks(ADD_BATCH_SIZE) {
            let result = async {
                let mut tx = self.pool.begin().await?;
                let n = self.write_batch(&mut tx, batch).await?;
                tx.commit().await?;
                Ok::<usize, IndexError>(n)
            }
            .await;

            match result {
                Ok(n) => written += n,
                Err(e) => {
                    tracing::error!(doc_id = %document.metadata.doc_id, written, error = %e, "failed to add document batch");
                    return Err(e);
                }
            }
        }

        tracing::debug!(doc_id = %document.metadata.doc_id, written, "document indexed");
        Ok(written)
    }

    /// Replace every record of `document.metadata.doc_id` in one transaction.
    pub async fn reindex(&self, document: &Document) -> Result<usize, IndexError> {
        let result = async {
            let mut tx = self.pool.begin().await?;
            sqlx::query("DELETE FROM chunk_records WHERE collection = ? AND doc_id = ?")
                .bind(&self.collection)
                .bind(&document.metadata.doc_id)
                .execute(&mut *tx)
                .await?;

            let records = build_records(document);
            let mut written = 0;
            for batch in records.chunks(ADD_BATCH_SIZE) {
                written += self.write_batch(&mut tx, batch).await?;
            }
            tx.commit().await?;
            Ok::<usize, IndexError>(written)
        }
        .await;

        result.map_err(|e| {
            tracing::error!(doc_id = %document.metadata.doc_id, error = %e, "failed to reindex document");
            e
        })
    }

    async fn write_batch(
        &self,
        conn: &mut SqliteConnection,
        batch: &[PendingRecord],
    ) -> Result<usize, IndexError> {
        let texts: Vec<String> = batch.iter().map(|r| r.content.clone()).collect();
        let vectors = self
            .embedder
            .embed(&texts)
            .await
            .map_err(|e| IndexError::Embedding(e.to_string()))?;

        let dims = self.embedder.dims();
        let bad_dims = vectors.iter().find(|v| v.len() != dims).map(|v| v.len());
        if vectors.len() != batch.len() || bad_dims.is_some() {
            return Err(IndexError::ModelMismatch {
                expected: batch.len(),
                expected_dims: dims,
                got: vectors.len(),
                got_dims: bad_dims.unwrap_or(dims),
            });
        }

        let now = Utc::now().timestamp();
        for (record, vector) in batch.iter().zip(vectors.iter()) {
            sqlx::query(
                r#"
                INSERT INTO chunk_records
                    (id, collection, doc_id, title, doc_type, page_number, chunk_index,
                     content, hash, metadata_json, embedding, model, dims, created_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&record.id)
            .bind(&self.collection)
            .bind(&record.doc_id)
            .bind(&record.title)
            .bind(&record.doc_type)
            .bind(&record.page_number)
            .bind(record.chunk_index)
            .bind(&record.content)
            .bind(&record.hash)
            .bind(&record.metadata_json)
            .bind(vec_to_blob(vector))
            .bind(self.embedder.model_name())
            .bind(dims as i64)
            .bind(now)
            .execute(&mut *conn)
            .await?;
        }

        Ok(batch.len())
    }

    /// The `n_results` chunks nearest to `query`, nearest first.
    ///
    /// Filter keys other than `doc_id`, `title`, `doc_type` and
    /// `page_number` (1-based) are ignored.
    pub async fn search(
        &self,
        query: &str,
        n_results: usize,
        filters: &BTreeMap<String, String>,
    ) -> Result<Vec<SearchResult>, IndexError> {
        if n_results == 0 {
            return Ok(Vec::new());
        }

        self.search_inner(query, n_results, filters)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "search failed");
                e
            })
    }

    async fn search_inner(
        &self,
        query: &str,
        n_results: usize,
        filters: &BTreeMap<String, String>,
    ) -> Result<Vec<SearchResult>, IndexError> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT id, doc_id, title, doc_type, page_number, chunk_index, content, \
             metadata_json, embedding, model, dims FROM chunk_records WHERE collection = ",
        );
        qb.push_bind(&self.collection);
        for (key, value) in filters {
            match filter_column(key) {
                Some(column) => {
                    qb.push(format!(" AND {} = ", column));
                    qb.push_bind(value);
                }
                None => tracing::debug!(key = %key, "ignoring unsupported filter key"),
            }
        }
        qb.push(" ORDER BY rowid");

        let rows = qb.build().fetch_all(&self.pool).await?;
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let query_vec = self
            .embedder
            .embed(&[query.to_string()])
            .await
            .map_err(|e| IndexError::Embedding(e.to_string()))?
            .into_iter()
            .next()
            .ok_or_else(|| IndexError::Embedding("empty embedding response".to_string()))?;

        let model = self.embedder.model_name();
        let dims = self.embedder.dims() as i64;
        let mut skipped = 0usize;
        let mut scored: Vec<(f64, &SqliteRow)> = Vec::with_capacity(rows.len());

        for row in &rows {
            let row_model: String = row.try_get("model")?;
            let row_dims: i64 = row.try_get("dims")?;
            if row_model != model || row_dims != dims {
                skipped += 1;
                continue;
            }
            let blob: Vec<u8> = row.try_get("embedding")?;
            scored.push((cosine_distance(&query_vec, &blob_to_vec(&blob)), row));
        }

        if skipped > 0 {
            tracing::warn!(skipped, model, "skipped records embedded with a different model");
        }

        // Stable: equal distances keep insertion order.
        scored.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(n_results);

        scored
            .into_iter()
            .map(|(distance, row)| row_to_result(row, distance))
            .collect()
    }

    /// Remove every record of `doc_id`. Returns the number removed.
    pub async fn delete(&self, doc_id: &str) -> Result<u64, IndexError> {
        let result = sqlx::query("DELETE FROM chunk_records WHERE collection = ? AND doc_id = ?")
            .bind(&self.collection)
            .bind(doc_id)
            .execute(&self.pool)
            .await;

        match result {
            Ok(r) => Ok(r.rows_affected()),
            Err(e) => {
                tracing::error!(doc_id, error = %e, "failed to delete document");
                Err(e.into())
            }
        }
    }

    /// Distinct document ids, sorted.
    pub async fn document_ids(&self) -> Result<Vec<String>, IndexError> {
        sqlx::query_scalar(
            "SELECT DISTINCT doc_id FROM chunk_records WHERE collection = ? ORDER BY doc_id",
        )
        .bind(&self.collection)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "failed to list documents");
            e.into()
        })
    }

    /// Number of stored chunk records.
    pub async fn count(&self) -> Result<u64, IndexError> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM chunk_records WHERE collection = ?")
            .bind(&self.collection)
            .fetch_one(&self.pool)
            .await
            .map(|n| n.max(0) as u64)
            .map_err(|e| {
                tracing::error!(error = %e, "failed to count records");
                e.into()
            })
    }

    /// Remove every record in the collection.
    pub async fn clear(&self) -> Result<(), IndexError> {
        sqlx::query("DELETE FROM chunk_records WHERE collection = ?")
            .bind(&self.collection)
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(|e| {
                tracing::error!(error = %e, "failed to clear index");
                e.into()
            })
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn build_records(document: &Document) -> Vec<PendingRecord> {
    let meta = &document.metadata;
    document
        .chunks
        .iter()
        .map(|chunk| {
            let page_number = (chunk.page_number + 1).to_string();

            let mut record = Map::new();
            record.insert("doc_id".into(), Value::from(meta.doc_id.clone()));
            record.insert("title".into(), Value::from(meta.title.clone()));
            record.insert("doc_type".into(), Value::from(meta.doc_type.as_str()));
            record.insert("page_number".into(), Value::from(page_number));
            record.insert("chunk_index".into(), Value::from(chunk.chunk_index));
            record.insert("source".into(), Value::from(meta.title.clone()));
            record.insert("upload_date".into(), Value::from(meta.upload_date.to_rfc3339()));
            // Chunk metadata last: it wins on key collisions.
            for (k, v) in &chunk.metadata {
                record.insert(k.clone(), Value::from(v.clone()));
            }

            // Filter columns mirror the stored JSON.
            let column = |key: &str| record.get(key).map(value_to_string).unwrap_or_default();
            let (doc_id, title, doc_type, page_number) = (
                column("doc_id"),
                column("title"),
                column("doc_type"),
                column("page_number"),
            );

            PendingRecord {
                id: Uuid::new_v4().to_string(),
                doc_id,
                title,
                doc_type,
                page_number,
                chunk_index: chunk.chunk_index as i64,
                content: chunk.content.clone(),
                hash: format!("{:x}", Sha256::digest(chunk.content.as_bytes())),
                metadata_json: Value::Object(record).to_string(),
            }
        })
        .collect()
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn row_to_result(row: &SqliteRow, distance: f64) -> Result<SearchResult, IndexError> {
    let id: String = row.try_get("id")?;
    let doc_id: String = row.try_get("doc_id")?;
    let title: String = row.try_get("title")?;
    let doc_type: String = row.try_get("doc_type")?;
    let page_number: String = row.try_get("page_number")?;
    let chunk_index: i64 = row.try_get("chunk_index")?;
    let content: String = row.try_get("content")?;
    let metadata_json: String = row.try_get("metadata_json")?;

    let stored: Map<String, Value> = serde_json::from_str(&metadata_json).unwrap_or_default();
    let flat: BTreeMap<String, String> = stored
        .iter()
        .map(|(k, v)| (k.clone(), value_to_string(v)))
        .collect();

    let mut document = DocumentMetadata::new(
        doc_id.clone(),
        title,
        doc_type.parse().unwrap_or(DocType::Text),
    );
    document.upload_date = flat
        .get("upload_date")
        .and_then(|d| DateTime::parse_from_rfc3339(d).ok())
        .map(|d| d.with_timezone(&Utc))
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
    document.source = flat.get("source").cloned();
    document.custom_metadata = flat
        .iter()
        .filter(|(k, _)| !DOCUMENT_KEYS.contains(&k.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    let page = page_number.parse::<usize>().unwrap_or(1).saturating_sub(1);
    let chunk_index = chunk_index.max(0) as usize;

    Ok(SearchResult {
        chunk: DocumentChunk {
            chunk_id: id,
            doc_id,
            content,
            page_number: page,
            chunk_index,
            metadata: flat,
            embedding: None,
        },
        score: distance_to_score(distance),
        document,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result as AnyResult;
    use async_trait::async_trait;
    use docsift_core::assemble::{assemble, Page};
    use docsift_core::embedding::HashedEmbedder;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    async fn open_index(dir: &TempDir, embedder: Arc<dyn Embedder>) -> EmbeddingIndex {
        let config = IndexConfig {
            persist_dir: dir.path().join("db"),
            collection: "test".to_string(),
        };
        EmbeddingIndex::open(&config, embedder).await.unwrap()
    }

    fn hashed() -> Arc<dyn Embedder> {
        Arc::new(HashedEmbedder::new("hashed-test", 512))
    }

    fn doc(doc_id: &str, pages: &[&str]) -> Document {
        let pages = pages
            .iter()
            .enumerate()
            .map(|(i, t)| Page::new(i, *t))
            .collect();
        assemble(doc_id, &format!("{}.txt", doc_id), DocType::Text, pages).unwrap()
    }

    /// Counts embed calls and fails on the configured call number.
    struct FlakyEmbedder {
        inner: HashedEmbedder,
        calls: AtomicUsize,
        fail_on: usize,
    }

    #[async_trait]
    impl Embedder for FlakyEmbedder {
        fn model_name(&self) -> &str {
            self.inner.model_name()
        }
        fn dims(&self) -> usize {
            self.inner.dims()
        }
        async fn embed(&self, texts: &[String]) -> AnyResult<Vec<Vec<f32>>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call == self.fail_on {
                anyhow::bail!("embedding service unavailable");
            }
            self.inner.embed(texts).await
        }
    }

    #[tokio::test]
    async fn test_add_then_search_round_trip() {
        let dir = TempDir::new().unwrap();
        let index = open_index(&dir, hashed()).await;
        let d = doc("notes", &["the quarterly revenue grew", "kafka consumer lag alerts"]);

        assert_eq!(index.add(&d).await.unwrap(), 2);
        let hits = index
            .search("kafka consumer lag alerts", 5, &BTreeMap::new())
            .await
            .unwrap();

        assert_eq!(hits[0].document.doc_id, "notes");
        assert_eq!(hits[0].chunk.content, "kafka consumer lag alerts");
        assert_eq!(hits[0].chunk.page_number, 1);
        assert_eq!(hits[0].chunk.chunk_index, 1);
        assert!(hits[0].score > 0.0 && hits[0].score <= 1.0);
        assert_eq!(hits[0].document.doc_type, DocType::Text);
        assert_eq!(hits[0].chunk.metadata["page"], "2");
        assert_eq!(hits[0].chunk.metadata["source"], "notes.txt");
        assert!(!hits[0].document.custom_metadata.contains_key("doc_id"));
    }

    #[tokio::test]
    async fn test_empty_index_and_zero_results() {
        let dir = TempDir::new().unwrap();
        let index = open_index(&dir, hashed()).await;
        assert!(index.search("x", 5, &BTreeMap::new()).await.unwrap().is_empty());

        index.add(&doc("a", &["alpha"])).await.unwrap();
        assert!(index.search("alpha", 0, &BTreeMap::new()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_adding_twice_duplicates_records() {
        let dir = TempDir::new().unwrap();
        let index = open_index(&dir, hashed()).await;
        let d = doc("dup", &["one", "two", "three"]);

        index.add(&d).await.unwrap();
        index.add(&d).await.unwrap();
        assert_eq!(index.count().await.unwrap(), 6);
        assert_eq!(index.document_ids().await.unwrap(), vec!["dup".to_string()]);

        let keys: Vec<String> = sqlx::query_scalar("SELECT id FROM chunk_records")
            .fetch_all(&index.pool)
            .await
            .unwrap();
        let unique: std::collections::HashSet<_> = keys.iter().collect();
        assert_eq!(unique.len(), 6);
    }

    #[tokio::test]
    async fn test_search_results_carry_record_ids() {
        let dir = TempDir::new().unwrap();
        let index = open_index(&dir, hashed()).await;
        let d = doc("dup", &["kafka replication"]);

        index.add(&d).await.unwrap();
        index.add(&d).await.unwrap();
        let hits = index
            .search("kafka replication", 5, &BTreeMap::new())
            .await
            .unwrap();
        assert_eq!(hits.len(), 2);
        assert_ne!(hits[0].chunk.chunk_id, hits[1].chunk.chunk_id);
        assert!(Uuid::parse_str(&hits[0].chunk.chunk_id).is_ok());

        // Re-adding after a delete never reuses an id.
        let before: Vec<String> = hits.into_iter().map(|h| h.chunk.chunk_id).collect();
        index.reindex(&d).await.unwrap();
        let after = index
            .search("kafka replication", 5, &BTreeMap::new())
            .await
            .unwrap();
        assert_eq!(after.len(), 1);
        assert!(!before.contains(&after[0].chunk.chunk_id));
    }

    #[tokio::test]
    async fn test_chunk_metadata_override_reaches_filter_columns() {
        let dir = TempDir::new().unwrap();
        let index = open_index(&dir, hashed()).await;
        let mut d = doc("report", &["appendix tables"]);
        d.chunks[0]
            .metadata
            .insert("title".to_string(), "Appendix".to_string());
        index.add(&d).await.unwrap();

        let mut filters = BTreeMap::new();
        filters.insert("title".to_string(), "Appendix".to_string());
        let hits = index.search("appendix", 5, &filters).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].document.title, "Appendix");
        assert_eq!(hits[0].chunk.metadata["title"], "Appendix");

        filters.insert("title".to_string(), "report".to_string());
        assert!(index.search("appendix", 5, &filters).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_filters_and_unknown_keys() {
        let dir = TempDir::new().unwrap();
        let index = open_index(&dir, hashed()).await;
        index.add(&doc("a", &["shared words here", "page two"])).await.unwrap();
        index.add(&doc("b", &["shared words here"])).await.unwrap();

        let mut filters = BTreeMap::new();
        filters.insert("doc_id".to_string(), "b".to_string());
        let hits = index.search("shared words", 10, &filters).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].document.doc_id, "b");

        let mut filters = BTreeMap::new();
        filters.insert("page_number".to_string(), "2".to_string());
        filters.insert("color".to_string(), "blue".to_string());
        let hits = index.search("page", 10, &filters).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].chunk.content, "page two");
    }

    #[tokio::test]
    async fn test_results_ordered_by_distance_and_truncated() {
        let dir = TempDir::new().unwrap();
        let index = open_index(&dir, hashed()).await;
        index
            .add(&doc("d", &["red green blue", "red green", "red", "yellow"]))
            .await
            .unwrap();

        let hits = index.search("red green blue", 3, &BTreeMap::new()).await.unwrap();
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].chunk.content, "red green blue");
        assert!((hits[0].score - 1.0).abs() < 1e-6);
        assert!(hits[0].score >= hits[1].score && hits[1].score >= hits[2].score);
    }

    #[tokio::test]
    async fn test_other_model_records_are_skipped() {
        let dir = TempDir::new().unwrap();
        let index = open_index(&dir, hashed()).await;
        index.add(&doc("old", &["legacy content"])).await.unwrap();
        index.close().await;

        let other: Arc<dyn Embedder> = Arc::new(HashedEmbedder::new("other-model", 512));
        let index = open_index(&dir, other).await;
        index.add(&doc("new", &["legacy content"])).await.unwrap();

        let hits = index.search("legacy content", 10, &BTreeMap::new()).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].document.doc_id, "new");
    }

    #[tokio::test]
    async fn test_batches_commit_independently() {
        let dir = TempDir::new().unwrap();
        let flaky = Arc::new(FlakyEmbedder {
            inner: HashedEmbedder::new("hashed-test", 64),
            calls: AtomicUsize::new(0),
            fail_on: 3,
        });
        let index = open_index(&dir, flaky.clone()).await;

        let texts: Vec<String> = (0..250).map(|i| format!("chunk number {}", i)).collect();
        let refs: Vec<&str> = texts.iter().map(|s| s.as_str()).collect();
        let big = doc("big", &refs);

        let err = index.add(&big).await.unwrap_err();
        assert!(matches!(err, IndexError::Embedding(_)));
        assert_eq!(index.count().await.unwrap(), 200);
    }

    #[tokio::test]
    async fn test_delete_reindex_clear() {
        let dir = TempDir::new().unwrap();
        let index = open_index(&dir, hashed()).await;
        index.add(&doc("a", &["one", "two"])).await.unwrap();
        index.add(&doc("b", &["three"])).await.unwrap();

        assert_eq!(index.delete("a").await.unwrap(), 2);
        assert_eq!(index.delete("a").await.unwrap(), 0);
        assert_eq!(index.document_ids().await.unwrap(), vec!["b".to_string()]);

        index.add(&doc("b", &["three"])).await.unwrap();
        assert_eq!(index.count().await.unwrap(), 2);
        assert_eq!(index.reindex(&doc("b", &["three", "four"])).await.unwrap(), 2);
        assert_eq!(index.count().await.unwrap(), 2);

        index.clear().await.unwrap();
        assert_eq!(index.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_records_survive_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let index = open_index(&dir, hashed()).await;
            index.add(&doc("persisted", &["durable text"])).await.unwrap();
            index.close().await;
        }
        let index = open_index(&dir, hashed()).await;
        let hits = index.search("durable text", 1, &BTreeMap::new()).await.unwrap();
        assert_eq!(hits[0].document.doc_id, "persisted");
    }
}
