//! Receipt API handlers
//!
//! Contains HTTP request handlers for receipt CRUD operations and image
//! upload/download. All logic lives in [`ReceiptService`](crate::services::ReceiptService).

use crate::api::extract::{AppJson, AppPath};
use crate::error::AppError;
use crate::receipts::{NewReceipt, Receipt, ReceiptImage, ReceiptUpdate, DEFAULT_IMAGE_TYPE};
use crate::state::AppState;
use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection}, Multipart, State,
    },
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
};
use tracing::{error, warn};
use uuid::Uuid;

/// Multipart field carrying the receipt image
const UPLOAD_FIELD: &str = "file";

/// GET /api/receipts - List all receipts
pub async fn list_receipts(
    State(state): State<AppState>,
) -> Result<Json<Vec<Receipt>>, AppError> {
    Ok(Json(state.receipts.get_all_receipts().await?))
}

/// GET /api/receipts/:id - Get a specific receipt
pub async fn get_receipt(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<Receipt>, AppError> {
    Ok(Json(state.receipts.get_receipt_by_id(id).await?))
}

/// POST /api/receipts - Create a receipt from metadata
pub async fn create_receipt(
    State(state): State<AppState>,
    AppJson(request): AppJson<NewReceipt>,
) -> Result<(StatusCode, Json<Receipt>), AppError> {
    let receipt = state.receipts.create_receipt(request).await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

/// POST /api/receipts/upload - Create a receipt from an uploaded image
///
/// Accepts multipart form data with the image in the `file` field.
pub async fn upload_receipt(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<Receipt>), AppError> {
    let mut multipart = multipart?;
    let mut image = None;

    while let Some(field) = multipart.next_field().await.map_err(upload_error)? {
        let field_name = field.name().unwrap_or("").to_string();
        if field_name != UPLOAD_FIELD {
            warn!("Unknown multipart field: {}", field_name);
            continue;
        }
        if image.is_some() {
            warn!("Duplicate multipart field: {}, keeping the last one", field_name);
        }

        let content_type = field.content_type().map(str::to_string);
        let data = field.bytes().await.map_err(upload_error)?;
        image = Some(ReceiptImage::new(data.to_vec(), content_type));
    }

    let image = image.ok_or_else(|| AppError::InvalidUpload("No file uploaded".to_string()))?;
    let receipt = state.receipts.create_receipt_with_image(image).await?;

    Ok((StatusCode::CREATED, Json(receipt)))
}

/// GET /api/receipts/:id/image - Raw image bytes of a receipt
pub async fn get_receipt_image(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Response, AppError> {
    let image = state.receipts.get_receipt_image(id).await?;

    let content_type = HeaderValue::from_str(image.content_type()).unwrap_or_else(|_| {
        warn!(receipt_id = %id, "Stored image type is not a valid header value");
        HeaderValue::from_static(DEFAULT_IMAGE_TYPE)
    });

    Ok(([(header::CONTENT_TYPE, content_type)], image.data).into_response())
}

/// PUT /api/receipts/:id - Update a receipt
pub async fn update_receipt(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
    AppJson(request): AppJson<ReceiptUpdate>,
) -> Result<Json<Receipt>, AppError> {
    Ok(Json(state.receipts.update_receipt(id, request).await?))
}

/// DELETE /api/receipts/:id - Delete a receipt
pub async fn delete_receipt(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> Result<StatusCode, AppError> {
    state.receipts.delete_receipt(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Map a multipart read failure onto the upload error taxonomy
fn upload_error(e: MultipartError) -> AppError {
    let status = e.status();
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(e.body_text())
    } else if status.is_client_error() {
        AppError::InvalidUpload(e.body_text())
    } else {
        error!("Failed to read multipart upload: {}", e);
        AppError::UploadFailed(e.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::receipts::ReceiptDb;
    use std::sync::Arc;
    use tempfile::TempDir;

    async fn create_test_state() -> (AppState, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");
        let db = ReceiptDb::new(db_path.to_str().unwrap(), 1)
            .await
            .expect("Failed to create test database");
        (AppState::new(Arc::new(db)), temp_dir)
    }

    #[tokio::test]
    async fn test_list_receipts_empty() {
        let (state, _temp_dir) = create_test_state().await;
        let result = list_receipts(State(state)).await;
        assert!(result.is_ok());
        assert!(result.unwrap().0.is_empty());
    }

    #[tokio::test]
    async fn test_create_receipt() {
        let (state, _temp_dir) = create_test_state().await;
        let request = NewReceipt {
            vendor: Some("Bookshop".to_string()),
            total: Some(15.0),
            ..Default::default()
        };

        let (status, response) = create_receipt(State(state.clone()), AppJson(request))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(response.vendor.as_deref(), Some("Bookshop"));

        let list = list_receipts(State(state)).await.unwrap();
        assert_eq!(list.0.len(), 1);
        assert_eq!(list.0[0].id, response.id);
    }

    #[tokio::test]
    async fn test_get_receipt_not_found() {
        let (state, _temp_dir) = create_test_state().await;
        let result = get_receipt(State(state), AppPath(Uuid::new_v4())).await;
        match result.unwrap_err() {
            AppError::ReceiptNotFound(_) => {}
            other => panic!("Expected ReceiptNotFound error, got: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_delete_receipt_returns_no_content() {
        let (state, _temp_dir) = create_test_state().await;
        let created = state
            .receipts
            .create_receipt(NewReceipt::default())
            .await
            .unwrap();

        let status = delete_receipt(State(state.clone()), AppPath(created.id))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::NO_CONTENT);

        let result = get_receipt(State(state), AppPath(created.id)).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_get_receipt_image_sets_content_type() {
        let (state, _temp_dir) = create_test_state().await;
        let created = state
            .receipts
            .create_receipt_with_image(ReceiptImage::new(
                vec![1, 2, 3, 4],
                Some("image/png".to_string()),
            ))
            .await
            .unwrap();

        let response = get_receipt_image(State(state), AppPath(created.id))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "image/png"
        );

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], &[1u8, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_get_receipt_image_missing() {
        let (state, _temp_dir) = create_test_state().await;
        let created = state
            .receipts
            .create_receipt(NewReceipt::default())
            .await
            .unwrap();

        let result = get_receipt_image(State(state), AppPath(created.id)).await;
        assert!(matches!(result, Err(AppError::ImageNotFound(_))));
    }
}
