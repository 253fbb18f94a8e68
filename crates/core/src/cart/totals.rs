//! Derived cart values: item count, subtotal, shipping fee, and total.
//!
//! Everything here is recomputed from a [`CartState`] on demand. Nothing is
//! stored, so the cart page, the checkout page, and the header badge always
//! agree.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::state::CartState;
use crate::types::LineItemId;

/// Shipping method selected at checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShippingMethod {
    /// Tiered: flat fee below the free-shipping threshold, free at or above it.
    #[default]
    Standard,
    /// Flat express fee regardless of subtotal.
    Express,
}

impl std::fmt::Display for ShippingMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Standard => write!(f, "standard"),
            Self::Express => write!(f, "express"),
        }
    }
}

impl std::str::FromStr for ShippingMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "standard" => Ok(Self::Standard),
            "express" => Ok(Self::Express),
            _ => Err(format!("invalid shipping method: {s}")),
        }
    }
}

/// Shipping fee schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShippingPolicy {
    /// Subtotal at or above which standard shipping is free.
    pub free_shipping_threshold: Decimal,
    /// Standard fee charged below the threshold.
    pub standard_fee: Decimal,
    /// Express fee, charged regardless of subtotal.
    pub express_fee: Decimal,
}

impl ShippingPolicy {
    pub const DEFAULT_FREE_SHIPPING_THRESHOLD: Decimal = Decimal::from_parts(500_000, 0, 0, false, 0);
    pub const DEFAULT_STANDARD_FEE: Decimal = Decimal::from_parts(30_000, 0, 0, false, 0);
    pub const DEFAULT_EXPRESS_FEE: Decimal = Decimal::from_parts(50_000, 0, 0, false, 0);

    /// Shipping fee for `cart` under `method`.
    ///
    /// An empty cart ships nothing and is charged nothing.
    #[must_use]
    pub fn shipping_fee(&self, cart: &CartState, method: ShippingMethod) -> Decimal {
        if cart.is_empty() {
            return Decimal::ZERO;
        }
        match method {
            ShippingMethod::Express => self.express_fee,
            ShippingMethod::Standard if cart.subtotal() >= self.free_shipping_threshold => {
                Decimal::ZERO
            }
            ShippingMethod::Standard => self.standard_fee,
        }
    }

    /// How much more the customer must spend to get free standard shipping.
    #[must_use]
    pub fn amount_until_free_shipping(&self, subtotal: Decimal) -> Decimal {
        (self.free_shipping_threshold - subtotal).max(Decimal::ZERO)
    }
}

impl Default for ShippingPolicy {
    fn default() -> Self {
        Self {
            free_shipping_threshold: Self::DEFAULT_FREE_SHIPPING_THRESHOLD,
            standard_fee: Self::DEFAULT_STANDARD_FEE,
            express_fee: Self::DEFAULT_EXPRESS_FEE,
        }
    }
}

/// Totals derived from a cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartTotals {
    pub item_count: u64,
    pub subtotal: Decimal,
    pub shipping_fee: Decimal,
    pub total: Decimal,
}

impl CartTotals {
    /// Compute totals for `cart`.
    #[must_use]
    pub fn compute(cart: &CartState, policy: &ShippingPolicy, method: ShippingMethod) -> Self {
        let subtotal = cart.subtotal();
        let shipping_fee = policy.shipping_fee(cart, method);
        Self {
            item_count: cart.item_count(),
            subtotal,
            shipping_fee,
            total: subtotal.saturating_add(shipping_fee),
        }
    }
}

/// One row of the order summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutLine {
    pub id: LineItemId,
    pub name: String,
    pub variant_name: Option<String>,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub line_total: Decimal,
}

/// Order summary shared by the cart and checkout pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSummary {
    pub lines: Vec<CheckoutLine>,
    pub shipping_method: ShippingMethod,
    pub totals: CartTotals,
    /// Remaining spend before standard shipping becomes free.
    pub amount_until_free_shipping: Decimal,
}

impl CheckoutSummary {
    #[must_use]
    pub fn new(cart: &CartState, policy: &ShippingPolicy, method: ShippingMethod) -> Self {
        let totals = cart.totals(policy, method);
        let lines = cart
            .items()
            .iter()
            .map(|item| CheckoutLine {
                id: item.id.clone(),
                name: item.name.clone(),
                variant_name: item.variant_name.clone(),
                quantity: item.quantity,
                unit_price: item.price,
                line_total: item.line_total(),
            })
            .collect();

        Self {
            lines,
            shipping_method: method,
            totals,
            amount_until_free_shipping: policy.amount_until_free_shipping(totals.subtotal),
        }
    }
}
