//! Request middleware and extractors.

pub mod session;

pub use session::{CartSession, SESSION_HEADER, session_header};
