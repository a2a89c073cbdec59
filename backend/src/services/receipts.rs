//! Receipt service
//!
//! Business logic for receipts: server-side timestamps, image URLs and the
//! field-by-field update merge. Persistence is delegated to a [`ReceiptStore`].

use crate::error::AppError;
use crate::receipts::{NewReceipt, Receipt, ReceiptImage, ReceiptStore, ReceiptUpdate};
use chrono::Utc;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Receipt service
#[derive(Clone)]
pub struct ReceiptService {
    store: Arc<dyn ReceiptStore>,
}

impl ReceiptService {
    /// Create a service backed by the given store
    pub fn new(store: Arc<dyn ReceiptStore>) -> Self {
        Self { store }
    }

    /// All stored receipts
    pub async fn get_all_receipts(&self) -> Result<Vec<Receipt>, AppError> {
        Ok(self.store.find_all().await?)
    }

    /// Fetch a receipt by id
    ///
    /// # Returns
    /// * `Err(AppError::ReceiptNotFound)` if no receipt has this id
    pub async fn get_receipt_by_id(&self, id: Uuid) -> Result<Receipt, AppError> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or(AppError::ReceiptNotFound(id))
    }

    /// Create a receipt from client metadata
    ///
    /// `created_at` is always the current server time.
    pub async fn create_receipt(&self, input: NewReceipt) -> Result<Receipt, AppError> {
        let receipt = self.store.save(Receipt::new(input, Utc::now())).await?;
        info!(receipt_id = %receipt.id, "Created receipt");
        Ok(receipt)
    }

    /// Create an image-only receipt
    ///
    /// The id is allocated before the insert so `image_url` is written in the
    /// same statement as the image.
    ///
    /// # Returns
    /// * `Err(AppError::InvalidUpload)` if the image has no bytes
    pub async fn create_receipt_with_image(
        &self,
        image: ReceiptImage,
    ) -> Result<Receipt, AppError> {
        if image.is_empty() {
            return Err(AppError::InvalidUpload("No file uploaded".to_string()));
        }

        let size = image.data.len();
        let receipt = self
            .store
            .save(Receipt::with_image(image, Utc::now()))
            .await?;

        info!(
            receipt_id = %receipt.id,
            image_type = receipt.image_type.as_deref().unwrap_or_default(),
            size,
            "Created receipt from uploaded image"
        );
        Ok(receipt)
    }

    /// Merge an update onto an existing receipt
    ///
    /// # Returns
    /// * `Err(AppError::ReceiptNotFound)` if no receipt has this id
    /// * `Err(AppError::InvalidUpload)` if the update carries malformed image data
    pub async fn update_receipt(
        &self,
        id: Uuid,
        update: ReceiptUpdate,
    ) -> Result<Receipt, AppError> {
        let mut existing = self.get_receipt_by_id(id).await?;

        existing
            .apply_update(update)
            .map_err(|e| AppError::InvalidUpload(format!("Invalid image_data: {}", e)))?;

        let receipt = self.store.save(existing).await?;
        info!(receipt_id = %receipt.id, "Updated receipt");
        Ok(receipt)
    }

    /// Delete a receipt
    ///
    /// # Returns
    /// * `Err(AppError::ReceiptNotFound)` if no receipt has this id
    pub async fn delete_receipt(&self, id: Uuid) -> Result<(), AppError> {
        if !self.store.exists_by_id(id).await? {
            return Err(AppError::ReceiptNotFound(id));
        }

        self.store.delete_by_id(id).await?;
        info!(receipt_id = %id, "Deleted receipt");
        Ok(())
    }

    /// Stored image of a receipt
    ///
    /// # Returns
    /// * `Err(AppError::ReceiptNotFound)` if no receipt has this id
    /// * `Err(AppError::ImageNotFound)` if the receipt has no image
    pub async fn get_receipt_image(&self, id: Uuid) -> Result<ReceiptImage, AppError> {
        self.get_receipt_by_id(id)
            .await?
            .image()
            .ok_or(AppError::ImageNotFound(id))
    }
}
