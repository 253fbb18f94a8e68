//! Cart commands.
//!
//! Each invocation hydrates the file-backed cart, applies one operation, and
//! logs the notices the storefront would have shown as toasts.
//!
//! # Environment Variables
//!
//! - `CART_STORAGE_DIR` - Directory holding the persisted cart
//! - `CART_STORAGE_KEY` - Key the cart is stored under
//! - `CART_FREE_SHIPPING_THRESHOLD`, `CART_STANDARD_SHIPPING_FEE`,
//!   `CART_EXPRESS_SHIPPING_FEE` - Shipping fee schedule

use rust_decimal::Decimal;
use tokio::sync::broadcast;
use tracing::{info, warn};

use snack_shop_core::{CartChange, CartLineItem, LineItemId, NoChange, ShippingMethod, ShippingPolicy};
use snack_shop_storefront::{CartConfig, CartStore, FileStore, Notice, NoticeKind, StorefrontError};

/// An open cart plus the receiver for its notices.
pub struct Session {
    store: CartStore<FileStore>,
    notices: broadcast::Receiver<Notice>,
    shipping: ShippingPolicy,
}

impl Session {
    /// Load configuration and hydrate the cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the storage
    /// directory cannot be created.
    pub fn open() -> Result<Self, StorefrontError> {
        let config = CartConfig::from_env()?;
        let store = config.open_store()?;
        info!(
            dir = %config.storage_dir.display(),
            key = %config.storage_key,
            items = store.state().len(),
            "Opened cart"
        );

        let notices = store.notices();
        Ok(Self {
            store,
            notices,
            shipping: config.shipping,
        })
    }

    /// Add a line item built from command-line arguments.
    ///
    /// # Errors
    ///
    /// Returns an error if the quantity or price is invalid.
    pub fn add(
        &mut self,
        id: String,
        name: String,
        price: Decimal,
        quantity: u32,
        variant: Option<String>,
        image: Option<String>,
    ) -> Result<(), StorefrontError> {
        let mut item = CartLineItem::new(id, name, price, quantity)?;
        if let Some(variant) = variant {
            item = item.with_variant(variant);
        }
        if let Some(image) = image {
            item = item.with_image(image);
        }

        let change = self.store.add(item);
        self.report(&change);
        Ok(())
    }

    pub fn remove(&mut self, id: &LineItemId) {
        let change = self.store.remove(id);
        self.report(&change);
    }

    pub fn set_quantity(&mut self, id: &LineItemId, quantity: i64) {
        let change = self.store.update_quantity(id, quantity);
        self.report(&change);
    }

    pub fn increment(&mut self, id: &LineItemId) {
        let change = self.store.increment(id);
        self.report(&change);
    }

    pub fn decrement(&mut self, id: &LineItemId) {
        let change = self.store.decrement(id);
        self.report(&change);
    }

    pub fn clear(&mut self) {
        let change = self.store.clear();
        self.report(&change);
    }

    /// Log every line and the derived totals.
    pub fn show(&self, express: bool) {
        let method = if express {
            ShippingMethod::Express
        } else {
            ShippingMethod::Standard
        };
        let summary = self.store.checkout_summary(&self.shipping, method);

        if summary.lines.is_empty() {
            info!("Cart is empty");
            return;
        }

        for line in &summary.lines {
            info!(
                "  {} {}{} x{} @ {} = {}",
                line.id,
                line.name,
                line.variant_name
                    .as_deref()
                    .map(|v| format!(" ({v})"))
                    .unwrap_or_default(),
                line.quantity,
                line.unit_price,
                line.line_total
            );
        }

        let totals = summary.totals;
        info!("Items: {}", totals.item_count);
        info!("Subtotal: {}", totals.subtotal);
        info!("Shipping ({method}): {}", totals.shipping_fee);
        info!("Total: {}", totals.total);
        if method == ShippingMethod::Standard && !summary.amount_until_free_shipping.is_zero() {
            info!(
                "Spend {} more for free shipping",
                summary.amount_until_free_shipping
            );
        }
    }

    fn report(&mut self, change: &CartChange) {
        while let Ok(notice) = self.notices.try_recv() {
            match notice.kind {
                NoticeKind::PersistenceFailed => warn!("{}", notice.message),
                _ => info!("{}", notice.message),
            }
        }

        match change {
            CartChange::QuantityUpdated { quantity } => info!("Quantity set to {quantity}"),
            CartChange::Unchanged(NoChange::UnknownItem) => {
                info!("No such item in the cart, nothing changed");
            }
            CartChange::Unchanged(NoChange::InvalidQuantity) => {
                info!("Quantity must be at least 1, nothing changed");
            }
            CartChange::Unchanged(NoChange::InvalidPrice) => {
                info!("Price must not be negative, nothing changed");
            }
            CartChange::Unchanged(NoChange::TotalOverflow) => {
                info!("Cart total would be too large, nothing changed");
            }
            _ => {}
        }

        let totals = self.store.totals(&self.shipping, ShippingMethod::Standard);
        info!(
            items = totals.item_count,
            subtotal = %totals.subtotal,
            total = %totals.total,
            "Cart"
        );
    }
}
