//! The cart aggregate and its pure transition function.
//!
//! [`CartState::apply`] takes the current state and a [`CartAction`] and
//! returns the next state together with a [`CartChange`] describing what
//! happened. Persistence and notifications are left to the caller, which
//! decides what to do from the `CartChange` alone.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::line_item::{CartLineItem, LineItemError};
use super::totals::{CartTotals, ShippingMethod, ShippingPolicy};
use crate::types::LineItemId;

/// A requested mutation of the cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartAction {
    /// Add an item, merging with an existing line of the same ID.
    Add(CartLineItem),
    /// Remove the line with this ID.
    Remove(LineItemId),
    /// Set the quantity of an existing line.
    ///
    /// Signed so that out-of-range input from the UI can be rejected here
    /// instead of at every call site.
    UpdateQuantity { id: LineItemId, quantity: i64 },
    /// Remove every line.
    Clear,
}

/// Why an action left the cart untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NoChange {
    /// No line with the given ID exists.
    UnknownItem,
    /// The quantity was below 1 (or above `u32::MAX`).
    InvalidQuantity,
    /// The item's unit price was negative.
    InvalidPrice,
    /// The resulting line total or subtotal would not fit in a `Decimal`.
    TotalOverflow,
}

/// Outcome of applying a [`CartAction`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartChange {
    /// A new line was appended.
    Added,
    /// An existing line absorbed the added quantity.
    Merged {
        /// Quantity of the line after merging.
        quantity: u32,
    },
    /// A line was removed.
    Removed(CartLineItem),
    /// A line's quantity was replaced.
    QuantityUpdated {
        /// The new quantity.
        quantity: u32,
    },
    /// All lines were removed.
    Cleared,
    /// Nothing changed.
    Unchanged(NoChange),
}

impl CartChange {
    /// Returns `true` if the state was (or may have been) modified.
    #[must_use]
    pub const fn is_change(&self) -> bool {
        !matches!(self, Self::Unchanged(_))
    }
}

/// Result of [`CartState::apply`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub state: CartState,
    pub change: CartChange,
}

/// The cart: an ordered sequence of line items, unique by ID.
///
/// Serializes as a bare JSON array of line items.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CartState {
    items: Vec<CartLineItem>,
}

impl CartState {
    /// An empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Build a cart by replaying `items` as additions.
    ///
    /// Duplicate IDs are merged and items that break an invariant are
    /// skipped. Returns the cart and the items that were skipped.
    #[must_use]
    pub fn from_items(items: Vec<CartLineItem>) -> (Self, Vec<CartLineItem>) {
        let mut state = Self::new();
        let mut rejected = Vec::new();
        for item in items {
            let Transition { state: next, change } = state.apply(CartAction::Add(item.clone()));
            if change.is_change() {
                state = next;
            } else {
                rejected.push(item);
            }
        }
        (state, rejected)
    }

    /// Apply an action and return the resulting state.
    #[must_use]
    pub fn apply(&self, action: CartAction) -> Transition {
        let mut items = self.items.clone();
        let change = match action {
            CartAction::Add(item) => add(&mut items, item),
            CartAction::Remove(id) => remove(&mut items, &id),
            CartAction::UpdateQuantity { id, quantity } => update_quantity(&mut items, &id, quantity),
            CartAction::Clear => {
                items.clear();
                CartChange::Cleared
            }
        };
        if change.is_change() && checked_subtotal(&items).is_none() {
            return Transition {
                state: self.clone(),
                change: CartChange::Unchanged(NoChange::TotalOverflow),
            };
        }
        Transition {
            state: Self { items },
            change,
        }
    }

    /// Line items in insertion order.
    #[must_use]
    pub fn items(&self) -> &[CartLineItem] {
        &self.items
    }

    /// Look up a line item by ID.
    #[must_use]
    pub fn get(&self, id: &LineItemId) -> Option<&CartLineItem> {
        self.items.iter().find(|item| &item.id == id)
    }

    /// Number of distinct line items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Total units across all lines, for the cart badge.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.items.iter().map(|item| u64::from(item.quantity)).sum()
    }

    /// Sum of price times quantity over all lines.
    ///
    /// Saturates at `Decimal::MAX`. States built through [`CartState::apply`]
    /// always have a representable subtotal.
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        checked_subtotal(&self.items).unwrap_or(Decimal::MAX)
    }

    /// Derive the totals shown on the cart and checkout pages.
    #[must_use]
    pub fn totals(&self, policy: &ShippingPolicy, method: ShippingMethod) -> CartTotals {
        CartTotals::compute(self, policy, method)
    }
}

fn checked_subtotal(items: &[CartLineItem]) -> Option<Decimal> {
    items.iter().try_fold(Decimal::ZERO, |sum, item| {
        sum.checked_add(item.checked_line_total()?)
    })
}

fn add(items: &mut Vec<CartLineItem>, item: CartLineItem) -> CartChange {
    match item.validate() {
        Ok(()) => {}
        Err(LineItemError::InvalidQuantity(_)) => {
            return CartChange::Unchanged(NoChange::InvalidQuantity);
        }
        Err(LineItemError::AmountOverflow { .. }) => {
            return CartChange::Unchanged(NoChange::TotalOverflow);
        }
        Err(_) => return CartChange::Unchanged(NoChange::InvalidPrice),
    }

    match items.iter_mut().find(|existing| existing.id == item.id) {
        Some(existing) => {
            existing.quantity = existing.quantity.saturating_add(item.quantity);
            CartChange::Merged {
                quantity: existing.quantity,
            }
        }
        None => {
            items.push(item);
            CartChange::Added
        }
    }
}

fn remove(items: &mut Vec<CartLineItem>, id: &LineItemId) -> CartChange {
    match items.iter().position(|item| &item.id == id) {
        Some(index) => CartChange::Removed(items.remove(index)),
        None => CartChange::Unchanged(NoChange::UnknownItem),
    }
}

fn update_quantity(items: &mut [CartLineItem], id: &LineItemId, quantity: i64) -> CartChange {
    let Some(quantity) = u32::try_from(quantity).ok().filter(|q| *q >= 1) else {
        return CartChange::Unchanged(NoChange::InvalidQuantity);
    };

    match items.iter_mut().find(|item| &item.id == id) {
        Some(item) => {
            item.quantity = quantity;
            CartChange::QuantityUpdated { quantity }
        }
        None => CartChange::Unchanged(NoChange::UnknownItem),
    }
}
