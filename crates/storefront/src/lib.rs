//! Snack Shop Storefront library.
//!
//! Client-side state for the storefront: the cart store, its storage backends,
//! and the configuration that ties them together.
//!
//! # Example
//!
//! ```rust
//! use rust_decimal::Decimal;
//! use snack_shop_core::{CartLineItem, ShippingMethod, ShippingPolicy};
//! use snack_shop_storefront::{CartStore, MemoryStore};
//!
//! let mut cart = CartStore::open(MemoryStore::new());
//! let mut badge = cart.subscribe();
//!
//! let item = CartLineItem::new("1", "Banh trang tron", Decimal::new(75000, 0), 2).unwrap();
//! cart.add(item);
//!
//! assert_eq!(badge.borrow_and_update().item_count(), 2);
//!
//! let totals = cart.totals(&ShippingPolicy::default(), ShippingMethod::Standard);
//! assert_eq!(totals.total, Decimal::new(180000, 0));
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod config;
pub mod error;
pub mod storage;

pub use cart::{CartStore, DEFAULT_STORAGE_KEY, Notice, NoticeKind};
pub use config::{CartConfig, ConfigError};
pub use error::{Result, StorefrontError};
pub use storage::{FileStore, KeyValueStore, MemoryStore, StorageError};
