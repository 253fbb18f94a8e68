//! Snack Shop Core - Cart state machine and shared types.
//!
//! This crate provides the types used across all Snack Shop components:
//! - `storefront` - Cart store with durable client-side persistence
//! - `cli` - Command-line front end for inspecting and editing a cart
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no storage,
//! no HTTP clients. Every cart transition is a plain function of the previous
//! state and an action, so it can be tested without a UI or a storage backend.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs and the REST catalog contracts
//! - [`cart`] - Line items, the cart reducer, and derived totals

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod types;

pub use cart::*;
pub use types::*;
