//! Integration tests for Snack Shop.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p snack-shop-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `cart_persistence` - File-backed carts across store instances
//! - `checkout_flow` - Catalog payload to checkout summary
//!
//! Helpers shared by the test files live here.

use std::path::{Path, PathBuf};

use snack_shop_storefront::{CartConfig, CartStore, FileStore};

/// A uniquely named directory under the system temp dir, removed on drop.
pub struct TempCartDir {
    path: PathBuf,
}

impl TempCartDir {
    #[must_use]
    pub fn new() -> Self {
        let path = std::env::temp_dir().join(format!("snack-shop-it-{}", uuid::Uuid::new_v4()));
        Self { path }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Configuration pointing the cart at this directory.
    #[must_use]
    pub fn config(&self) -> CartConfig {
        CartConfig {
            storage_dir: self.path.clone(),
            ..CartConfig::default()
        }
    }

    /// Open a fresh store instance over this directory, as a new process would.
    ///
    /// # Panics
    ///
    /// Panics if the directory cannot be created or the key is invalid.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn open(&self) -> CartStore<FileStore> {
        self.config()
            .open_store()
            .expect("temp cart directory should be creatable")
    }

    /// Path of the persisted cart file.
    #[must_use]
    pub fn cart_file(&self) -> PathBuf {
        self.path.join("cartItems.json")
    }
}

impl Default for TempCartDir {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TempCartDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.path);
    }
}
