//! Unified error type for the fallible parts of the storefront.
//!
//! Cart operations themselves never fail; these errors come from setting up a
//! cart (configuration, opening storage) or from building line items out of
//! user input.

use thiserror::Error;

use snack_shop_core::LineItemError;

use crate::config::ConfigError;
use crate::storage::StorageError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum StorefrontError {
    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Storage could not be opened or accessed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// A line item was rejected before reaching the cart.
    #[error("Invalid line item: {0}")]
    LineItem(#[from] LineItemError),
}

/// Result type alias for `StorefrontError`.
pub type Result<T> = std::result::Result<T, StorefrontError>;
