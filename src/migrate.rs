use anyhow::Result;
use sqlx::SqlitePool;

/// Create the chunk table and its lookup index. Idempotent.
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS chunks (
            id TEXT PRIMARY KEY,
            path TEXT NOT NULL,
            modified_time INTEGER NOT NULL,
            content TEXT NOT NULL,
            model_id TEXT NOT NULL,
            dimension INTEGER NOT NULL,
            vector BLOB NOT NULL,
            start_line INTEGER NOT NULL,
            end_line INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Every store operation is scoped by model; most also by path.
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_chunks_model_path ON chunks(model_id, path)")
        .execute(pool)
        .await?;

    Ok(())
}
