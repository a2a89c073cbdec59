//! Receipt data models
//!
//! Defines the persisted receipt record and the request payloads that
//! create or modify it.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Content type served for images stored without one
pub const DEFAULT_IMAGE_TYPE: &str = "image/jpeg";

/// A stored receipt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Receipt {
    /// Unique identifier, generated at creation
    pub id: Uuid,
    /// When the receipt was created (server time)
    pub created_at: DateTime<Utc>,
    /// Optional owner reference
    pub user_id: Option<String>,
    /// Merchant name as entered by the client
    pub vendor: Option<String>,
    /// Date of purchase, free text as entered by the client
    pub date: Option<String>,
    /// Total amount of the purchase
    pub total: Option<f64>,
    /// Path clients use to fetch the stored image
    pub image_url: Option<String>,
    /// Raw image bytes, only served by the image endpoint
    #[serde(skip)]
    pub image_data: Option<Vec<u8>>,
    /// MIME type of `image_data`
    pub image_type: Option<String>,
}

impl Receipt {
    /// Create a new receipt from client metadata
    ///
    /// The id is generated here; `created_at` is supplied by the caller so the
    /// service owns the clock.
    pub fn new(input: NewReceipt, created_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at,
            user_id: input.user_id,
            vendor: input.vendor,
            date: input.date,
            total: input.total,
            image_url: input.image_url,
            image_data: None,
            image_type: None,
        }
    }

    /// Create an image-only receipt whose `image_url` points at itself
    pub fn with_image(image: ReceiptImage, created_at: DateTime<Utc>) -> Self {
        let id = Uuid::new_v4();
        let image_type = image.content_type().to_string();
        Self {
            id,
            created_at,
            user_id: None,
            vendor: None,
            date: None,
            total: None,
            image_url: Some(Self::image_path(id)),
            image_data: Some(image.data),
            image_type: Some(image_type),
        }
    }

    /// Path of the image endpoint for a receipt
    pub fn image_path(id: Uuid) -> String {
        format!("/api/receipts/{}/image", id)
    }

    /// Merge an update onto this receipt
    ///
    /// `vendor`, `date`, `total` and `image_url` are always overwritten, even
    /// with `None`. Image fields are only replaced when the update carries
    /// non-empty image data.
    ///
    /// # Returns
    /// * `Err(DecodeError)` if `image_data` is not valid base64; the receipt
    ///   is left unchanged in that case
    pub fn apply_update(&mut self, update: ReceiptUpdate) -> Result<(), base64::DecodeError> {
        let image = update.decode_image()?;

        self.vendor = update.vendor;
        self.date = update.date;
        self.total = update.total;
        self.image_url = update.image_url;

        if let Some(image) = image {
            self.image_type = Some(image.content_type().to_string());
            self.image_data = Some(image.data);
        }

        Ok(())
    }

    /// Stored image, if any
    pub fn image(&self) -> Option<ReceiptImage> {
        self.image_data.as_ref().map(|data| ReceiptImage {
            data: data.clone(),
            content_type: self.image_type.clone(),
        })
    }
}

/// Request body for creating a receipt from metadata
///
/// Unknown fields such as `id` or `created_at` are ignored.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct NewReceipt {
    /// Optional owner reference
    #[serde(default)]
    pub user_id: Option<String>,
    /// Merchant name
    #[serde(default)]
    pub vendor: Option<String>,
    /// Date of purchase
    #[serde(default)]
    pub date: Option<String>,
    /// Total amount
    #[serde(default)]
    pub total: Option<f64>,
    /// Image path, if the client already has one
    #[serde(default)]
    pub image_url: Option<String>,
}

/// Request body for replacing a receipt's editable fields
///
/// Missing fields deserialize to `None` and clear the stored value.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ReceiptUpdate {
    /// New merchant name
    #[serde(default)]
    pub vendor: Option<String>,
    /// New date of purchase
    #[serde(default)]
    pub date: Option<String>,
    /// New total amount
    #[serde(default)]
    pub total: Option<f64>,
    /// New image path
    #[serde(default)]
    pub image_url: Option<String>,
    /// Replacement image, base64 encoded
    #[serde(default)]
    pub image_data: Option<String>,
    /// MIME type of the replacement image
    #[serde(default)]
    pub image_type: Option<String>,
}

impl ReceiptUpdate {
    /// Decode the replacement image carried by this update
    ///
    /// An empty `image_data` string counts as no image.
    pub fn decode_image(&self) -> Result<Option<ReceiptImage>, base64::DecodeError> {
        let Some(encoded) = self.image_data.as_deref() else {
            return Ok(None);
        };

        let data = STANDARD.decode(encoded.trim())?;
        if data.is_empty() {
            return Ok(None);
        }

        Ok(Some(ReceiptImage::new(data, self.image_type.clone())))
    }
}

/// Binary image attached to a receipt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptImage {
    /// Raw image bytes
    pub data: Vec<u8>,
    /// Declared MIME type
    pub content_type: Option<String>,
}

impl ReceiptImage {
    /// Create an image from raw bytes
    ///
    /// Blank content types are treated as missing.
    pub fn new(data: Vec<u8>, content_type: Option<String>) -> Self {
        let content_type = content_type.filter(|t| !t.trim().is_empty());
        Self { data, content_type }
    }

    /// Effective content type, falling back to [`DEFAULT_IMAGE_TYPE`]
    pub fn content_type(&self) -> &str {
        self.content_type.as_deref().unwrap_or(DEFAULT_IMAGE_TYPE)
    }

    /// Whether the image has no bytes
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
