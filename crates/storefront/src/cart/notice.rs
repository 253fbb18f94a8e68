//! Toast notifications emitted by the cart store.

use serde::Serialize;

use snack_shop_core::{CartChange, CartLineItem, LineItemId};

/// What happened, as far as the shopper needs to know.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NoticeKind {
    /// A new line was added.
    ItemAdded { id: LineItemId, name: String },
    /// An existing line absorbed the added quantity.
    QuantityIncreased {
        id: LineItemId,
        name: String,
        quantity: u32,
    },
    /// A line was removed.
    ItemRemoved { id: LineItemId, name: String },
    /// The cart was emptied.
    CartCleared,
    /// The cart changed in memory but could not be saved.
    PersistenceFailed,
}

/// A transient message for the shopper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    #[serde(flatten)]
    pub kind: NoticeKind,
    pub message: String,
}

impl Notice {
    /// The notice to show for `change`, if any.
    ///
    /// `item` is the line as it stands after the change (for additions) or the
    /// line that was removed. Quantity edits and no-ops are silent.
    #[must_use]
    pub fn for_change(change: &CartChange, item: Option<&CartLineItem>) -> Option<Self> {
        let kind = match (change, item) {
            (CartChange::Added, Some(item)) => NoticeKind::ItemAdded {
                id: item.id.clone(),
                name: display_name(item),
            },
            (CartChange::Merged { quantity }, Some(item)) => NoticeKind::QuantityIncreased {
                id: item.id.clone(),
                name: display_name(item),
                quantity: *quantity,
            },
            (CartChange::Removed(item), _) => NoticeKind::ItemRemoved {
                id: item.id.clone(),
                name: display_name(item),
            },
            (CartChange::Cleared, _) => NoticeKind::CartCleared,
            _ => return None,
        };
        Some(Self::from(kind))
    }
}

impl From<NoticeKind> for Notice {
    fn from(kind: NoticeKind) -> Self {
        let message = match &kind {
            NoticeKind::ItemAdded { name, .. } => format!("Added {name} to your cart"),
            NoticeKind::QuantityIncreased { name, quantity, .. } => {
                format!("Updated {name} quantity to {quantity}")
            }
            NoticeKind::ItemRemoved { name, .. } => format!("Removed {name} from your cart"),
            NoticeKind::CartCleared => "Your cart is now empty".to_string(),
            NoticeKind::PersistenceFailed => {
                "Your cart could not be saved on this device. It will be kept until you close the app."
                    .to_string()
            }
        };
        Self { kind, message }
    }
}

fn display_name(item: &CartLineItem) -> String {
    match &item.variant_name {
        Some(variant) => format!("{} ({variant})", item.name),
        None => item.name.clone(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;
    use snack_shop_core::NoChange;

    use super::*;

    fn item() -> CartLineItem {
        CartLineItem::new("1-10", "Banh trang tron", Decimal::new(95_000, 0), 2)
            .unwrap()
            .with_variant("Large")
    }

    #[test]
    fn test_added_notice() {
        let notice = Notice::for_change(&CartChange::Added, Some(&item())).unwrap();
        assert!(matches!(notice.kind, NoticeKind::ItemAdded { .. }));
        assert_eq!(notice.message, "Added Banh trang tron (Large) to your cart");
    }

    #[test]
    fn test_merged_notice_differs_from_added() {
        let notice =
            Notice::for_change(&CartChange::Merged { quantity: 5 }, Some(&item())).unwrap();
        assert!(matches!(
            notice.kind,
            NoticeKind::QuantityIncreased { quantity: 5, .. }
        ));
        assert_eq!(notice.message, "Updated Banh trang tron (Large) quantity to 5");
    }

    #[test]
    fn test_removed_notice() {
        let notice = Notice::for_change(&CartChange::Removed(item()), None).unwrap();
        assert_eq!(notice.message, "Removed Banh trang tron (Large) from your cart");
    }

    #[test]
    fn test_silent_changes() {
        assert!(Notice::for_change(&CartChange::QuantityUpdated { quantity: 3 }, Some(&item())).is_none());
        assert!(Notice::for_change(&CartChange::Unchanged(NoChange::UnknownItem), None).is_none());
    }

    #[test]
    fn test_serializes_with_kind_tag() {
        let notice = Notice::from(NoticeKind::CartCleared);
        let json = serde_json::to_value(&notice).unwrap();
        assert_eq!(json["kind"], "cart_cleared");
        assert_eq!(json["message"], "Your cart is now empty");
    }
}
