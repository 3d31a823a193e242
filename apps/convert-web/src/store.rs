//! ProcessedFile repository over SQLite

use chrono::{SecondsFormat, Utc};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use crate::error::ApiError;
use crate::models::{DbProcessedFile, Operation, ProcessedFile};
use crate::storage::{BlobStore, Removal};

/// What a successful conversion leaves behind
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Output {
    /// Blob path of the processed file
    Blob(String),
    /// OCR result
    Text(String),
}

/// Blob cleanup performed by [`ProcessedFileStore::delete`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteOutcome {
    pub original: Removal,
    pub processed: Option<Removal>,
}

const SELECT_COLUMNS: &str = r#"
    SELECT id, operation, original_file, processed_file, extracted_text,
           created_at, file_size, is_processed, error_message
    FROM processed_files
"#;

#[derive(Debug, Clone)]
pub struct ProcessedFileStore {
    pool: SqlitePool,
}

impl ProcessedFileStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self, ApiError> {
        tracing::info!("Connecting to database: {}", database_url);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;

        let store = Self::new(pool);
        store.migrate().await?;
        Ok(store)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn migrate(&self) -> Result<(), ApiError> {
        tracing::info!("Running database migrations...");

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS processed_files (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                operation TEXT NOT NULL,
                original_file TEXT NOT NULL,
                processed_file TEXT,
                extracted_text TEXT,
                created_at TEXT NOT NULL,
                file_size INTEGER NOT NULL DEFAULT 0,
                is_processed BOOLEAN NOT NULL DEFAULT 0,
                error_message TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_processed_files_created_at
            ON processed_files(created_at)
            "#,
        )
        .execute(&self.pool)
        .await?;

        tracing::info!("Migrations complete");
        Ok(())
    }

    /// Insert a pending record and return its id.
    pub async fn create(
        &self,
        operation: Operation,
        original_file: &str,
        file_size: i64,
    ) -> Result<i64, ApiError> {
        // Fixed-width UTC timestamps sort lexically in creation order.
        let created_at = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);

        let result = sqlx::query(
            r#"
            INSERT INTO processed_files (operation, original_file, created_at, file_size, is_processed)
            VALUES (?, ?, ?, ?, 0)
            "#,
        )
        .bind(operation.code())
        .bind(original_file)
        .bind(&created_at)
        .bind(file_size)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Record a successful conversion.
    pub async fn attach_output(&self, id: i64, output: Output) -> Result<(), ApiError> {
        let (processed_file, extracted_text) = match output {
            Output::Blob(path) => (Some(path), None),
            Output::Text(text) => (None, Some(text)),
        };

        let result = sqlx::query(
            r#"
            UPDATE processed_files
            SET processed_file = ?, extracted_text = ?, is_processed = 1, error_message = NULL
            WHERE id = ?
            "#,
        )
        .bind(processed_file)
        .bind(extracted_text)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(ApiError::NotFound(format!("Record {}", id)));
        }
        Ok(())
    }

    /// Record a failed conversion.
    pub async fn mark_failed(&self, id: i64, message: &str) -> Result<(), ApiError> {
        let result = sqlx::query(
            r#"
            UPDATE processed_files
            SET is_processed = 0, error_message = ?
            WHERE id = ?
            "#,
        )
        .bind(message)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(ApiError::NotFound(format!("Record {}", id)));
        }
        Ok(())
    }

    pub async fn get(&self, id: i64) -> Result<ProcessedFile, ApiError> {
        let row: Option<DbProcessedFile> =
            sqlx::query_as(&format!("{} WHERE id = ?", SELECT_COLUMNS))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        let row = row.ok_or_else(|| ApiError::NotFound(format!("Record {}", id)))?;
        to_model(row)
    }

    /// The newest `limit` records, newest first.
    pub async fn list_recent(&self, limit: u32) -> Result<Vec<ProcessedFile>, ApiError> {
        let rows: Vec<DbProcessedFile> = sqlx::query_as(&format!(
            "{} ORDER BY created_at DESC, id DESC LIMIT ?",
            SELECT_COLUMNS
        ))
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(to_model).collect()
    }

    /// Remove both blobs, then the row. Blob cleanup never blocks the row delete.
    pub async fn delete(&self, id: i64, blobs: &BlobStore) -> Result<DeleteOutcome, ApiError> {
        let record = self.get(id).await?;

        let original = blobs.remove(&record.original_file).await;
        let processed = match &record.processed_file {
            Some(path) => Some(blobs.remove(path).await),
            None => None,
        };

        sqlx::query("DELETE FROM processed_files WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        tracing::info!(
            "Deleted record {} (original: {:?}, processed: {:?})",
            id,
            original,
            processed
        );
        Ok(DeleteOutcome {
            original,
            processed,
        })
    }
}

fn to_model(row: DbProcessedFile) -> Result<ProcessedFile, ApiError> {
    ProcessedFile::try_from(row).map_err(|e| ApiError::Internal(anyhow::anyhow!(e)))
}
