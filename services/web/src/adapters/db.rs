//! services/web/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `SubmissionStore` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use show_tell_core::domain::StoredRecord;
use show_tell_core::ports::{PortError, PortResult, SubmissionStore};
use sqlx::PgPool;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `SubmissionStore` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

/// Sorts `sqlx` failures into "could not reach the store" and "the store said no".
fn to_port_error(e: sqlx::Error) -> PortError {
    match e {
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => PortError::Unavailable(e.to_string()),
        sqlx::Error::Database(_) => PortError::Rejected(e.to_string()),
        _ => PortError::Unexpected(e.to_string()),
    }
}

fn to_count(value: usize) -> PortResult<i32> {
    i32::try_from(value).map_err(|_| PortError::Rejected(format!("Sentence count {} is too large", value)))
}

//=========================================================================================
// `SubmissionStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl SubmissionStore for DbAdapter {
    async fn insert(&self, record: &StoredRecord) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO student_inputs \
             (name, email, title, story, total_sentences, show_sentences, tell_sentences, reflection, week, comments) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(&record.name)
        .bind(&record.email)
        .bind(&record.title)
        .bind(&record.story)
        .bind(to_count(record.total_sentences)?)
        .bind(to_count(record.show_sentences)?)
        .bind(to_count(record.tell_sentences)?)
        .bind(&record.reflection)
        .bind(&record.week)
        .bind(&record.comments)
        .execute(&self.pool)
        .await
        .map_err(to_port_error)?;
        Ok(())
    }
}
