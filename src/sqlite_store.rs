//! SQLite-backed [`VectorStore`] implementation.
//!
//! Chunks live in a single `chunks` table keyed by id and scoped by
//! `model_id`; vectors are stored as little-endian `f32` blobs. Similarity
//! search loads a model's rows and ranks them in process with
//! [`rank_chunks`], the same ranking the in-memory store uses.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, SqlitePool, Transaction};

use quill_core::embedding::{blob_to_vec, vec_to_blob};
use quill_core::models::{Chunk, ChunkMetadata, SearchOptions, SimilarityResult};
use quill_core::store::{rank_chunks, VectorStore};

const SELECT_CHUNK: &str = "SELECT id, path, modified_time, content, model_id, dimension, \
                            vector, start_line, end_line FROM chunks";

/// SQLite implementation of the [`VectorStore`] trait.
pub struct SqliteVectorStore {
    pool: SqlitePool,
}

impl SqliteVectorStore {
    /// Wrap a pool whose schema was created by
    /// [`run_migrations`](crate::migrate::run_migrations).
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn row_to_chunk(row: &SqliteRow) -> Chunk {
    let blob: Vec<u8> = row.get("vector");
    let dimension: i64 = row.get("dimension");
    let start_line: i64 = row.get("start_line");
    let end_line: i64 = row.get("end_line");
    Chunk {
        id: row.get("id"),
        path: row.get("path"),
        modified_time: row.get("modified_time"),
        content: row.get("content"),
        embedding_model_id: row.get("model_id"),
        vector_dimension: dimension as usize,
        vector: blob_to_vec(&blob),
        metadata: ChunkMetadata {
            start_line: start_line as usize,
            end_line: end_line as usize,
        },
    }
}

async fn insert_all(tx: &mut Transaction<'_, Sqlite>, chunks: &[Chunk]) -> Result<()> {
    for chunk in chunks {
        sqlx::query(
            r#"
            INSERT INTO chunks (id, path, modified_time, content, model_id, dimension,
                                vector, start_line, end_line)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&chunk.id)
        .bind(&chunk.path)
        .bind(chunk.modified_time)
        .bind(&chunk.content)
        .bind(&chunk.embedding_model_id)
        .bind(chunk.vector_dimension as i64)
        .bind(vec_to_blob(&chunk.vector))
        .bind(chunk.metadata.start_line as i64)
        .bind(chunk.metadata.end_line as i64)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

async fn delete_all(
    tx: &mut Transaction<'_, Sqlite>,
    paths: &[String],
    model_id: &str,
) -> Result<()> {
    for path in paths {
        sqlx::query("DELETE FROM chunks WHERE model_id = ? AND path = ?")
            .bind(model_id)
            .bind(path)
            .execute(&mut **tx)
            .await?;
    }
    Ok(())
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    async fn insert(&self, chunks: &[Chunk]) -> Result<()> {
        chunks.iter().try_for_each(Chunk::validate)?;
        let mut tx = self.pool.begin().await?;
        insert_all(&mut tx, chunks).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn delete_by_paths(&self, paths: &[String], model_id: &str) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        delete_all(&mut tx, paths, model_id).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn replace_paths(
        &self,
        model_id: &str,
        paths: &[String],
        chunks: &[Chunk],
    ) -> Result<()> {
        chunks.iter().try_for_each(Chunk::validate)?;
        let mut tx = self.pool.begin().await?;
        delete_all(&mut tx, paths, model_id).await?;
        insert_all(&mut tx, chunks).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn clear(&self, model_id: &str) -> Result<()> {
        sqlx::query("DELETE FROM chunks WHERE model_id = ?")
            .bind(model_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_indexed_paths(&self, model_id: &str) -> Result<Vec<String>> {
        let paths: Vec<String> =
            sqlx::query_scalar("SELECT DISTINCT path FROM chunks WHERE model_id = ? ORDER BY path")
                .bind(model_id)
                .fetch_all(&self.pool)
                .await?;
        Ok(paths)
    }

    async fn chunks_for_path(&self, path: &str, model_id: &str) -> Result<Vec<Chunk>> {
        let rows = sqlx::query(&format!(
            "{} WHERE model_id = ? AND path = ? ORDER BY start_line",
            SELECT_CHUNK
        ))
        .bind(model_id)
        .bind(path)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(row_to_chunk).collect())
    }

    async fn similarity_search(
        &self,
        query: &[f32],
        model_id: &str,
        options: &SearchOptions,
    ) -> Result<Vec<SimilarityResult>> {
        let rows = sqlx::query(&format!("{} WHERE model_id = ? AND dimension = ?", SELECT_CHUNK))
            .bind(model_id)
            .bind(query.len() as i64)
            .fetch_all(&self.pool)
            .await?;
        let chunks: Vec<Chunk> = rows.iter().map(row_to_chunk).collect();
        Ok(rank_chunks(query, &chunks, options))
    }
}
