//! Millet Basket Core - Shared types and cart domain logic.
//!
//! This crate provides the types and pure business logic used across all
//! Millet Basket components:
//! - `storefront` - Public JSON API for the shop
//! - `cli` - Command-line tools for migrations and catalog seeding
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no
//! database access, no HTTP clients. Cart operations take the current cart
//! and return a new one; persistence is the caller's concern.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, emails, and session ids
//! - [`product`] - Product catalog model and weight-price map parsing
//! - [`pricing`] - Weight-aware unit price resolution
//! - [`cart`] - Cart reconciliation (add / update / remove / clear)
//! - [`summary`] - Order totals (subtotal, shipping, tax)

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod pricing;
pub mod product;
pub mod summary;
pub mod types;

pub use types::*;
