//! `Session-Id` header plumbing.
//!
//! The cart session identifier travels in the `Session-Id` request header;
//! clients mirror it to local storage. The [`CartSession`] extractor reads
//! it, issuing a fresh identifier when the header is absent or empty, and
//! every cart response echoes the effective id back in the same header so
//! a first-time client learns its identifier.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::response::AppendHeaders;
use tracing::debug;

use millet_basket_core::SessionId;

use crate::state::AppState;

/// Header carrying the cart session identifier, both directions.
pub const SESSION_HEADER: &str = "Session-Id";

/// Extractor for the cart session.
///
/// `is_new` is true when the identifier was issued for this request (the
/// client sent no usable header); handlers still echo the id either way.
#[derive(Debug, Clone)]
pub struct CartSession {
    pub id: SessionId,
    pub is_new: bool,
}

impl FromRequestParts<AppState> for CartSession {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let presented = parts
            .headers
            .get(SESSION_HEADER)
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.is_empty());

        match presented {
            Some(id) => Ok(Self {
                id: SessionId::new(id),
                is_new: false,
            }),
            None => {
                let id = state.carts().issue_session_id();
                debug!(session_id = %id, "issued new cart session");
                Ok(Self { id, is_new: true })
            }
        }
    }
}

/// Response headers echoing the session identifier.
#[must_use]
pub fn session_header(session: &CartSession) -> AppendHeaders<[(&'static str, String); 1]> {
    AppendHeaders([(SESSION_HEADER, session.id.as_str().to_owned())])
}
