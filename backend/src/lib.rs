//! Receiptly Backend Library
//!
//! This library exposes modules for testing and external use.
//! The main binary is in `src/main.rs`.

pub mod api;
pub mod config;
pub mod error;
/// Receipt records and storage
pub mod receipts;
pub mod services;
/// Application state management
///
/// Holds the services shared across request handlers.
pub mod state;

pub use api::create_router;
pub use state::AppState;
