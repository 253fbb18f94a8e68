//! Cart line items.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{LineItemId, Product, ProductVariant};

/// Errors that can occur when building a [`CartLineItem`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum LineItemError {
    /// Quantity must be at least one.
    #[error("quantity must be at least 1 (got {0})")]
    InvalidQuantity(i64),
    /// Unit price must not be negative.
    #[error("price must not be negative (got {0})")]
    NegativePrice(Decimal),
    /// Unit price times quantity does not fit in a `Decimal`.
    #[error("line total overflows ({price} x {quantity})")]
    AmountOverflow {
        /// Unit price.
        price: Decimal,
        /// Number of units.
        quantity: u32,
    },
    /// The variant does not belong to the product.
    #[error("variant {variant} does not belong to product {product}")]
    ForeignVariant {
        /// Product the line item was built from.
        product: String,
        /// Variant that was passed in.
        variant: String,
    },
}

/// One purchasable selection in the cart.
///
/// The unit price is snapshotted when the item is first added and is never
/// refreshed by later additions of the same item.
///
/// ## Examples
///
/// ```
/// use rust_decimal::Decimal;
/// use snack_shop_core::{CartLineItem, LineItemId};
///
/// let item = CartLineItem::new("1", "Banh trang tron", Decimal::new(75000, 0), 2)
///     .unwrap()
///     .with_image("/media/banh-trang.jpg");
///
/// assert_eq!(item.id, LineItemId::from("1"));
/// assert_eq!(item.line_total(), Decimal::new(150000, 0));
///
/// assert!(CartLineItem::new("1", "Banh trang tron", Decimal::new(75000, 0), 0).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineItem {
    /// Merge key: product ID, or product and variant.
    pub id: LineItemId,
    /// Display name.
    pub name: String,
    /// Chosen variant label, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant_name: Option<String>,
    /// Unit price at add time.
    pub price: Decimal,
    /// Display image reference.
    #[serde(default)]
    pub image: String,
    /// Number of units, always at least one.
    pub quantity: u32,
}

impl CartLineItem {
    /// Create a line item with no variant and no image.
    ///
    /// # Errors
    ///
    /// Returns an error if `quantity` is below 1 or `price` is negative.
    pub fn new(
        id: impl Into<LineItemId>,
        name: impl Into<String>,
        price: Decimal,
        quantity: u32,
    ) -> Result<Self, LineItemError> {
        let item = Self {
            id: id.into(),
            name: name.into(),
            variant_name: None,
            price,
            image: String::new(),
            quantity,
        };
        item.validate()?;
        Ok(item)
    }

    /// Build a line item from a catalog product and an optional variant.
    ///
    /// The variant's price and image take precedence over the product's.
    ///
    /// # Errors
    ///
    /// Returns an error if the variant belongs to a different product, if
    /// `quantity` is below 1, or if the resolved price is negative.
    pub fn from_product(
        product: &Product,
        variant: Option<&ProductVariant>,
        quantity: u32,
    ) -> Result<Self, LineItemError> {
        if let Some(v) = variant {
            if product.variant(v.id).is_none() {
                return Err(LineItemError::ForeignVariant {
                    product: product.id.to_string(),
                    variant: v.id.to_string(),
                });
            }
        }

        let item = Self {
            id: LineItemId::for_product(product.id, variant.map(|v| v.id)),
            name: product.name.clone(),
            variant_name: variant.map(|v| v.name.clone()),
            price: variant.and_then(|v| v.price).unwrap_or(product.price),
            image: variant
                .and_then(|v| v.image.clone())
                .or_else(|| product.image.clone())
                .unwrap_or_default(),
            quantity,
        };
        item.validate()?;
        Ok(item)
    }

    /// Set the variant label.
    #[must_use]
    pub fn with_variant(mut self, variant_name: impl Into<String>) -> Self {
        self.variant_name = Some(variant_name.into());
        self
    }

    /// Set the display image.
    #[must_use]
    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = image.into();
        self
    }

    /// Check the quantity and price invariants.
    ///
    /// # Errors
    ///
    /// Returns the first invariant the item violates.
    pub fn validate(&self) -> Result<(), LineItemError> {
        if self.quantity < 1 {
            return Err(LineItemError::InvalidQuantity(i64::from(self.quantity)));
        }
        if self.price.is_sign_negative() && !self.price.is_zero() {
            return Err(LineItemError::NegativePrice(self.price));
        }
        if self.checked_line_total().is_none() {
            return Err(LineItemError::AmountOverflow {
                price: self.price,
                quantity: self.quantity,
            });
        }
        Ok(())
    }

    /// Unit price multiplied by quantity, or `None` if that overflows.
    #[must_use]
    pub fn checked_line_total(&self) -> Option<Decimal> {
        self.price.checked_mul(Decimal::from(self.quantity))
    }

    /// Unit price multiplied by quantity.
    ///
    /// Saturates at `Decimal::MAX`; a validated item never gets there.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.checked_line_total().unwrap_or(Decimal::MAX)
    }
}
