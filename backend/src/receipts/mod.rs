//! Receipts module
//!
//! Receipt records and their SQLite-backed storage.

pub mod db;
pub mod models;
pub mod store;

pub use db::ReceiptDb;
pub use models::{NewReceipt, Receipt, ReceiptImage, ReceiptUpdate, DEFAULT_IMAGE_TYPE};
pub use store::{ReceiptStore, StoreError};
