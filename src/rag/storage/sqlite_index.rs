//! Embeddings index backed by `SQLite` + sqlite-vec.
//!
//! One row per chunk. `source` and `workspace` are duplicated out of the
//! metadata JSON into indexed columns so equality filters run in SQL before
//! the cosine ordering. Row order (`rowid`) gives the corpus snapshot order.

use rusqlite::OptionalExtension;
use tokio_rusqlite::Connection;
use tracing::debug;

use crate::rag::core::candidate::Passage;
use crate::rag::core::config::{StorageConfig, validate_table_name};
use crate::rag::core::errors::{RagError, RagResult};
use crate::rag::core::metadata::StoredMetadata;
use crate::rag::storage::embeddings_index::{
    EmbeddingsIndex, IndexedChunk, MetadataFilter, StoreFuture, workspace_filter,
};
use crate::rag::storage::sqlite_vec_loader::init_sqlite_vec_extension;

/// `SQLite` embeddings index.
pub struct SqliteEmbeddingsIndex {
    conn: Connection,
    table: String,
}

impl SqliteEmbeddingsIndex {
    /// Open (or create) the index at the configured path.
    ///
    /// # Errors
    /// Returns an error if the table name is not a plain identifier, the
    /// database cannot be opened or the schema cannot be created.
    pub async fn open(config: &StorageConfig) -> RagResult<Self> {
        validate_table_name(&config.table)?;
        init_sqlite_vec_extension();
        let conn = Connection::open(&config.sqlite_path).await?;
        Self::with_connection(conn, &config.table).await
    }

    /// Open a throwaway in-memory index.
    ///
    /// # Errors
    /// Returns an error if the schema cannot be created.
    pub async fn open_in_memory(table: &str) -> RagResult<Self> {
        init_sqlite_vec_extension();
        let conn = Connection::open_in_memory().await?;
        Self::with_connection(conn, table).await
    }

    async fn with_connection(conn: Connection, table: &str) -> RagResult<Self> {
        validate_table_name(table)?;
        let table = table.to_string();
        let ddl = format!(
            "CREATE TABLE IF NOT EXISTS {table} (
                id TEXT PRIMARY KEY,
                document TEXT NOT NULL,
                source TEXT NOT NULL,
                workspace TEXT NOT NULL,
                metadata_json TEXT NOT NULL,
                embedding BLOB NOT NULL
            );
            CREATE INDEX IF NOT EXISTS {table}_source_idx ON {table}(source);
            CREATE INDEX IF NOT EXISTS {table}_workspace_idx ON {table}(workspace);"
        );

        let version = conn
            .call(move |conn| {
                conn.execute_batch(&ddl)?;
                let version: Option<String> = conn
                    .query_row("SELECT vec_version()", [], |row| row.get(0))
                    .optional()?;
                Ok(version)
            })
            .await?;

        debug!(
            table = %table,
            sqlite_vec = version.as_deref().unwrap_or("unknown"),
            "embeddings index ready"
        );

        Ok(Self { conn, table })
    }
}

fn to_vec_json(embedding: &[f64]) -> RagResult<String> {
    #[allow(clippy::cast_possible_truncation)]
    let values: Vec<f32> = embedding.iter().map(|v| *v as f32).collect();
    Ok(serde_json::to_string(&values)?)
}

fn to_passage(document: String, metadata_json: &str) -> RagResult<Passage> {
    let stored: StoredMetadata = serde_json::from_str(metadata_json)?;
    Ok(Passage::new(document, stored.to_metadata()?))
}

impl EmbeddingsIndex for SqliteEmbeddingsIndex {
    fn upsert(&self, chunks: Vec<IndexedChunk>) -> StoreFuture<'_, RagResult<()>> {
        Box::pin(async move {
            if chunks.is_empty() {
                return Ok(());
            }

            let mut rows = Vec::with_capacity(chunks.len());
            for chunk in chunks {
                let metadata_json = serde_json::to_string(&chunk.metadata)?;
                let embedding_json = to_vec_json(&chunk.embedding)?;
                rows.push((
                    chunk.id.to_string(),
                    chunk.document,
                    chunk.metadata.source().to_string(),
                    chunk.metadata.workspace().to_string(),
                    metadata_json,
                    embedding_json,
                ));
            }

            let table = self.table.clone();
            self.conn
                .call(move |conn| {
                    let tx = conn.transaction()?;
                    {
                        let mut stmt = tx.prepare(&format!(
                            "INSERT INTO {table} (id, document, source, workspace, metadata_json, embedding)
                             VALUES (?1, ?2, ?3, ?4, ?5, vec_f32(?6))
                             ON CONFLICT(id) DO UPDATE SET
                                document = excluded.document,
                                source = excluded.source,
                                workspace = excluded.workspace,
                                metadata_json = excluded.metadata_json,
                                embedding = excluded.embedding"
                        ))?;
                        for row in &rows {
                            stmt.execute(rusqlite::params![
                                row.0, row.1, row.2, row.3, row.4, row.5
                            ])?;
                        }
                    }
                    tx.commit()?;
                    Ok(())
                })
                .await?;
            Ok(())
        })
    }

    fn query<'a>(
        &'a self,
        embedding: &'a [f64],
        n_results: usize,
        workspace: Option<&'a str>,
    ) -> StoreFuture<'a, RagResult<Vec<Passage>>> {
        Box::pin(async move {
            if n_results == 0 {
                return Ok(Vec::new());
            }

            let embedding_json = to_vec_json(embedding)?;
            let workspace = workspace_filter(workspace).map(str::to_string);
            let limit = i64::try_from(n_results)
                .map_err(|_| RagError::InvalidConfig("n_results is too large".to_string()))?;
            let table = self.table.clone();

            let rows = self
                .conn
                .call(move |conn| {
                    let mut stmt = conn.prepare(&format!(
                        "SELECT document, metadata_json FROM {table}
                         WHERE (?1 IS NULL OR workspace = ?1)
                         ORDER BY vec_distance_cosine(embedding, vec_f32(?2)) ASC, rowid ASC
                         LIMIT ?3"
                    ))?;
                    let rows = stmt
                        .query_map(rusqlite::params![workspace, embedding_json, limit], |row| {
                            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
                        })?
                        .collect::<Result<Vec<_>, rusqlite::Error>>()?;
                    Ok(rows)
                })
                .await?;

            rows.into_iter()
                .map(|(document, metadata_json)| to_passage(document, &metadata_json))
                .collect()
        })
    }

    fn get_all(&self) -> StoreFuture<'_, RagResult<Vec<Passage>>> {
        Box::pin(async move {
            let table = self.table.clone();
            let rows = self
                .conn
                .call(move |conn| {
                    let mut stmt = conn.prepare(&format!(
                        "SELECT document, metadata_json FROM {table} ORDER BY rowid ASC"
                    ))?;
                    let rows = stmt
                        .query_map([], |row| {
                            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
                        })?
                        .collect::<Result<Vec<_>, rusqlite::Error>>()?;
                    Ok(rows)
                })
                .await?;

            rows.into_iter()
                .map(|(document, metadata_json)| to_passage(document, &metadata_json))
                .collect()
        })
    }

    fn delete(&self, filter: MetadataFilter) -> StoreFuture<'_, RagResult<usize>> {
        Box::pin(async move {
            let (column, value) = match filter {
                MetadataFilter::Source(source) => ("source", source),
                MetadataFilter::Workspace(workspace) => ("workspace", workspace),
            };
            let table = self.table.clone();
            let removed = self
                .conn
                .call(move |conn| {
                    let removed = conn.execute(
                        &format!("DELETE FROM {table} WHERE {column} = ?1"),
                        rusqlite::params![value],
                    )?;
                    Ok(removed)
                })
                .await?;
            Ok(removed)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::core::candidate::ChunkId;
    use crate::rag::core::metadata::ChunkMetadata;

    fn chunk(source: &str, index: usize, text: &str, ws: Option<&str>, vec: Vec<f64>) -> IndexedChunk {
        let metadata = ChunkMetadata::new(source).to_stored(
            i64::try_from(index).unwrap(),
            ws,
        );
        IndexedChunk {
            id: ChunkId::for_chunk(source, index),
            document: text.to_string(),
            metadata,
            embedding: vec,
        }
    }

    async fn seeded() -> SqliteEmbeddingsIndex {
        let index = SqliteEmbeddingsIndex::open_in_memory("test_chunks").await.unwrap();
        index
            .upsert(vec![
                chunk("rh/a.pdf", 0, "congés payés", Some("rh"), vec![1.0, 0.0, 0.0]),
                chunk("it/b.pdf", 0, "télétravail", Some("it"), vec![0.9, 0.1, 0.0]),
                chunk("misc/c.txt", 0, "cantine", None, vec![0.0, 0.0, 1.0]),
            ])
            .await
            .unwrap();
        index
    }

    #[tokio::test]
    async fn test_query_orders_by_similarity() {
        let index = seeded().await;
        let hits = index.query(&[1.0, 0.0, 0.0], 2, None).await.unwrap();
        let texts: Vec<&str> = hits.iter().map(|p| p.text.as_str()).collect();
        assert_eq!(texts, vec!["congés payés", "télétravail"]);
    }

    #[tokio::test]
    async fn test_query_applies_workspace_filter() {
        let index = seeded().await;
        let hits = index.query(&[1.0, 0.0, 0.0], 5, Some("it")).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].metadata.workspace.as_deref(), Some("it"));

        let unfiltered = index.query(&[1.0, 0.0, 0.0], 5, Some("")).await.unwrap();
        assert_eq!(unfiltered.len(), 3);
    }

    #[tokio::test]
    async fn test_get_all_keeps_insertion_order_and_upsert_replaces() {
        let index = seeded().await;
        index
            .upsert(vec![chunk("rh/a.pdf", 0, "congés payés v2", Some("rh"), vec![1.0, 0.0, 0.0])])
            .await
            .unwrap();

        let all = index.get_all().await.unwrap();
        let texts: Vec<&str> = all.iter().map(|p| p.text.as_str()).collect();
        assert_eq!(texts, vec!["congés payés v2", "télétravail", "cantine"]);
        assert_eq!(all[2].metadata.workspace, None);
    }

    #[tokio::test]
    async fn test_delete_by_source_and_workspace() {
        let index = seeded().await;
        let removed = index
            .delete(MetadataFilter::Source("rh/a.pdf".to_string()))
            .await
            .unwrap();
        assert_eq!(removed, 1);

        let removed = index
            .delete(MetadataFilter::Workspace("it".to_string()))
            .await
            .unwrap();
        assert_eq!(removed, 1);

        let all = index.get_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].metadata.source, "misc/c.txt");
    }

    #[tokio::test]
    async fn test_rejects_table_name_with_sql() {
        let result = SqliteEmbeddingsIndex::open_in_memory("t (x TEXT); DROP TABLE other").await;
        assert!(matches!(result, Err(RagError::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn test_empty_index_returns_nothing() {
        let index = SqliteEmbeddingsIndex::open_in_memory("empty_chunks").await.unwrap();
        assert!(index.get_all().await.unwrap().is_empty());
        assert!(index.query(&[1.0, 0.0], 4, None).await.unwrap().is_empty());
    }
}
