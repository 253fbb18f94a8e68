//! Client-side cart.
//!
//! [`CartStore`] owns the cart and keeps it in sync with durable storage.
//! Views observe it through snapshot and notice channels; they never mutate
//! the cart directly.

mod notice;
mod store;

pub use notice::{Notice, NoticeKind};
pub use store::{CartStore, DEFAULT_STORAGE_KEY};
