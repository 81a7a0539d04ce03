//! Core types for Millet Basket.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod session;

pub use email::{Email, EmailError};
pub use id::*;
pub use session::SessionId;
