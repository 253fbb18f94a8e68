//! Shopping cart state machine.
//!
//! - [`line_item`] - A single product (or variant) selection and its quantity
//! - [`state`] - The cart aggregate and its pure transition function
//! - [`totals`] - Derived values: subtotal, tiered shipping, and total

pub mod line_item;
pub mod state;
pub mod totals;

pub use line_item::{CartLineItem, LineItemError};
pub use state::{CartAction, CartChange, CartState, NoChange, Transition};
pub use totals::{CartTotals, CheckoutLine, CheckoutSummary, ShippingMethod, ShippingPolicy};
