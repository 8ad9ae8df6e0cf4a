//! crates/show_tell_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of the model artifacts, the database and the mail transport.

use async_trait::async_trait;
use std::sync::Arc;

use crate::domain::StoredRecord;
use crate::email::FeedbackEmail;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, SMTP).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PortError {
    /// The external service could not be reached.
    #[error("Service unavailable: {0}")]
    Unavailable(String),
    /// The external service was reached but refused the request.
    #[error("Request rejected: {0}")]
    Rejected(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// A loaded vectorizer + classifier pair.
pub trait SentenceClassifier: Send + Sync {
    /// Labels a batch of normalized sentences with `0` (Show) or `1` (Tell).
    ///
    /// The output has the same length and order as the input.
    fn predict(&self, sentences: &[String]) -> PortResult<Vec<u8>>;
}

#[async_trait]
pub trait ClassifierLoader: Send + Sync {
    /// Returns the classifier, deserializing the artifacts if needed.
    async fn load(&self) -> PortResult<Arc<dyn SentenceClassifier>>;
}

#[async_trait]
pub trait SubmissionStore: Send + Sync {
    /// Appends one record. Calling twice writes two rows.
    async fn insert(&self, record: &StoredRecord) -> PortResult<()>;
}

#[async_trait]
pub trait FeedbackNotifier: Send + Sync {
    /// Delivers one plain-text summary email.
    async fn send(&self, email: &FeedbackEmail) -> PortResult<()>;
}
