//! Cart configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Optional
//! - `CART_STORAGE_DIR` - Directory holding the persisted cart (default: .snack-cart)
//! - `CART_STORAGE_KEY` - Key the cart is stored under (default: cartItems)
//! - `CART_FREE_SHIPPING_THRESHOLD` - Subtotal at which standard shipping is free (default: 500000)
//! - `CART_STANDARD_SHIPPING_FEE` - Standard fee below the threshold (default: 30000)
//! - `CART_EXPRESS_SHIPPING_FEE` - Flat express fee (default: 50000)

use std::path::PathBuf;
use std::str::FromStr;

use rust_decimal::Decimal;
use thiserror::Error;

use snack_shop_core::ShippingPolicy;

use crate::cart::{CartStore, DEFAULT_STORAGE_KEY};
use crate::storage::{FileStore, StorageError, validate_key};

const DEFAULT_STORAGE_DIR: &str = ".snack-cart";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Cart configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartConfig {
    /// Directory for the file-backed store
    pub storage_dir: PathBuf,
    /// Key the cart is persisted under
    pub storage_key: String,
    /// Shipping fee schedule
    pub shipping: ShippingPolicy,
}

impl Default for CartConfig {
    fn default() -> Self {
        Self {
            storage_dir: PathBuf::from(DEFAULT_STORAGE_DIR),
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            shipping: ShippingPolicy::default(),
        }
    }
}

impl CartConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set to an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set to an invalid value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let storage_dir = PathBuf::from(
            lookup("CART_STORAGE_DIR").unwrap_or_else(|| DEFAULT_STORAGE_DIR.to_string()),
        );

        let storage_key =
            lookup("CART_STORAGE_KEY").unwrap_or_else(|| DEFAULT_STORAGE_KEY.to_string());
        validate_key(&storage_key)
            .map_err(|e| ConfigError::InvalidEnvVar("CART_STORAGE_KEY".to_string(), e.to_string()))?;

        let shipping = ShippingPolicy {
            free_shipping_threshold: get_amount(
                &lookup,
                "CART_FREE_SHIPPING_THRESHOLD",
                ShippingPolicy::DEFAULT_FREE_SHIPPING_THRESHOLD,
            )?,
            standard_fee: get_amount(
                &lookup,
                "CART_STANDARD_SHIPPING_FEE",
                ShippingPolicy::DEFAULT_STANDARD_FEE,
            )?,
            express_fee: get_amount(
                &lookup,
                "CART_EXPRESS_SHIPPING_FEE",
                ShippingPolicy::DEFAULT_EXPRESS_FEE,
            )?,
        };

        Ok(Self {
            storage_dir,
            storage_key,
            shipping,
        })
    }

    /// Open the file-backed cart described by this configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage directory cannot be created or the
    /// storage key is invalid.
    pub fn open_store(&self) -> Result<CartStore<FileStore>, StorageError> {
        let storage = FileStore::open(&self.storage_dir)?;
        CartStore::open_with_key(storage, self.storage_key.clone())
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Parse a non-negative decimal amount, falling back to `default` when unset.
fn get_amount(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: Decimal,
) -> Result<Decimal, ConfigError> {
    let Some(raw) = lookup(key) else {
        return Ok(default);
    };
    let amount = Decimal::from_str(raw.trim())
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "must not be negative".to_string(),
        ));
    }
    Ok(amount)
}
