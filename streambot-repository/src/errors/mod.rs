//! Error types for the streambot repository.
//!
//! This module provides a unified error type for store and service operations.

mod store_error;

pub use store_error::StoreError;
