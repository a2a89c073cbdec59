//! Receipt store abstraction
//!
//! The service layer talks to persistence only through [`ReceiptStore`],
//! keyed by the receipt id.

use crate::receipts::models::Receipt;
use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

/// Errors raised by a receipt store
#[derive(Error, Debug)]
pub enum StoreError {
    /// The underlying database rejected a query
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A schema migration statement failed
    #[error("Migration failed: {source} - Statement: {statement}")]
    Migration {
        /// First characters of the failing statement
        statement: String,
        /// Error returned by the database
        #[source]
        source: sqlx::Error,
    },

    /// The store could not be opened
    #[error("Failed to open database: {0}")]
    Connect(String),
}

/// Persistence operations for receipts
#[async_trait]
pub trait ReceiptStore: Send + Sync {
    /// Every stored receipt
    async fn find_all(&self) -> Result<Vec<Receipt>, StoreError>;

    /// Look up a receipt by id
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Receipt>, StoreError>;

    /// Insert a new receipt or fully replace an existing one
    ///
    /// `created_at` of an existing row is never rewritten.
    async fn save(&self, receipt: Receipt) -> Result<Receipt, StoreError>;

    /// Whether a receipt with this id exists
    async fn exists_by_id(&self, id: Uuid) -> Result<bool, StoreError>;

    /// Remove a receipt; absent ids are ignored
    async fn delete_by_id(&self, id: Uuid) -> Result<(), StoreError>;
}
