// Application state management
// Holds the services shared by every request handler

use crate::config::Config;
use crate::error::AppError;
use crate::receipts::{ReceiptDb, ReceiptStore};
use crate::services::ReceiptService;
use std::sync::Arc;

/// Shared application state
///
/// Cheap to clone; all mutable state lives in the receipt store.
#[derive(Clone)]
pub struct AppState {
    /// Receipt business logic
    pub receipts: ReceiptService,
}

impl AppState {
    /// Create state over an existing receipt store
    pub fn new(store: Arc<dyn ReceiptStore>) -> Self {
        Self {
            receipts: ReceiptService::new(store),
        }
    }

    /// Open the configured database and build the application state
    pub async fn connect(config: &Config) -> Result<Self, AppError> {
        let db = ReceiptDb::new(&config.database.url, config.database.max_connections).await?;
        Ok(Self::new(Arc::new(db)))
    }
}
