//! Core types for Snack Shop.
//!
//! This module provides type-safe wrappers for identifiers and the payload
//! shapes returned by the catalog REST API.

pub mod catalog;
pub mod id;

pub use catalog::{ApiErrorBody, Page, Pagination, Product, ProductVariant};
pub use id::*;
