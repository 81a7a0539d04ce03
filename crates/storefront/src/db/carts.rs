//! Cart persistence keyed by session identifier.
//!
//! Implements the session/cart bridge contract: `load` fails with
//! [`StoreError::NotFound`] for unknown sessions (callers treat that as an
//! empty cart), `save` replaces the session's cart and assigns ids to new
//! line items, and `issue_session_id` mints a fresh opaque identifier.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use sqlx::{PgPool, Row};
use uuid::Uuid;

use millet_basket_core::cart::{LineItem, LineItemMeta};
use millet_basket_core::{LineItemId, ProductId, SessionId};

use super::StoreError;

/// Session-keyed cart storage, Postgres-backed or in-memory.
#[derive(Clone)]
pub enum CartStore {
    Postgres(PgCartStore),
    Memory(MemoryCartStore),
}

impl CartStore {
    /// Postgres-backed store.
    #[must_use]
    pub fn postgres(pool: PgPool) -> Self {
        Self::Postgres(PgCartStore { pool })
    }

    /// In-memory store for local dev and tests.
    #[must_use]
    pub fn memory() -> Self {
        Self::Memory(MemoryCartStore::default())
    }

    /// Mint a fresh session identifier. Called once per browser/device,
    /// when a request arrives without one.
    #[must_use]
    pub fn issue_session_id(&self) -> SessionId {
        SessionId::new(Uuid::new_v4().to_string())
    }

    /// Load the line items for a session.
    ///
    /// # Errors
    ///
    /// - [`StoreError::NotFound`] if the session is unknown (callers treat
    ///   this as an empty cart, not a failure).
    /// - [`StoreError::Storage`] on backend failure.
    pub async fn load(&self, session: &SessionId) -> Result<Vec<LineItem>, StoreError> {
        match self {
            Self::Postgres(store) => store.load(session).await,
            Self::Memory(store) => store.load(session),
        }
    }

    /// Replace the session's cart with `items`, assigning ids to items that
    /// have none. Returns the stored items (all with ids).
    ///
    /// # Errors
    ///
    /// [`StoreError::Storage`] on backend failure; the previous cart state
    /// remains visible in that case (no partial write).
    pub async fn save(
        &self,
        session: &SessionId,
        items: Vec<LineItem>,
    ) -> Result<Vec<LineItem>, StoreError> {
        match self {
            Self::Postgres(store) => store.save(session, items).await,
            Self::Memory(store) => store.save(session, items),
        }
    }
}

// =============================================================================
// Postgres
// =============================================================================

/// Cart store backed by the `cart_session` and `cart_item` tables.
#[derive(Clone)]
pub struct PgCartStore {
    pool: PgPool,
}

impl PgCartStore {
    async fn load(&self, session: &SessionId) -> Result<Vec<LineItem>, StoreError> {
        let known = sqlx::query("SELECT 1 FROM cart_session WHERE session_id = $1")
            .bind(session.as_str())
            .fetch_optional(&self.pool)
            .await?;
        if known.is_none() {
            return Err(StoreError::NotFound(format!("session {session}")));
        }

        let rows = sqlx::query(
            "SELECT id, product_id, quantity, meta_data
             FROM cart_item WHERE session_id = $1 ORDER BY id",
        )
        .bind(session.as_str())
        .fetch_all(&self.pool)
        .await?;

        let items = rows
            .iter()
            .map(|row| {
                let meta_data: Option<String> = row.get("meta_data");
                LineItem {
                    id: Some(LineItemId::new(row.get("id"))),
                    product_id: ProductId::new(row.get("product_id")),
                    quantity: u32::try_from(row.get::<i32, _>("quantity")).unwrap_or(1),
                    meta: LineItemMeta::from_meta_data(meta_data.as_deref()),
                    product: None,
                }
            })
            .collect();

        Ok(items)
    }

    async fn save(
        &self,
        session: &SessionId,
        items: Vec<LineItem>,
    ) -> Result<Vec<LineItem>, StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO cart_session (session_id) VALUES ($1)
             ON CONFLICT (session_id) DO NOTHING",
        )
        .bind(session.as_str())
        .execute(&mut *tx)
        .await?;

        // Drop rows no longer in the cart, keeping ids stable for the rest.
        let kept_ids: Vec<i32> = items
            .iter()
            .filter_map(|item| item.id.map(|id| id.as_i32()))
            .collect();
        sqlx::query("DELETE FROM cart_item WHERE session_id = $1 AND NOT (id = ANY($2))")
            .bind(session.as_str())
            .bind(&kept_ids)
            .execute(&mut *tx)
            .await?;

        let mut saved = Vec::with_capacity(items.len());
        for mut item in items {
            let quantity = i32::try_from(item.quantity)
                .map_err(|e| StoreError::Storage(e.to_string()))?;
            let meta_data = item.meta.to_meta_data();

            match item.id {
                Some(id) => {
                    sqlx::query(
                        "UPDATE cart_item SET quantity = $1, meta_data = $2
                         WHERE id = $3 AND session_id = $4",
                    )
                    .bind(quantity)
                    .bind(&meta_data)
                    .bind(id.as_i32())
                    .bind(session.as_str())
                    .execute(&mut *tx)
                    .await?;
                }
                None => {
                    let row = sqlx::query(
                        "INSERT INTO cart_item (session_id, product_id, quantity, meta_data)
                         VALUES ($1, $2, $3, $4) RETURNING id",
                    )
                    .bind(session.as_str())
                    .bind(item.product_id.as_i32())
                    .bind(quantity)
                    .bind(&meta_data)
                    .fetch_one(&mut *tx)
                    .await?;
                    item.id = Some(LineItemId::new(row.get("id")));
                }
            }
            saved.push(item);
        }

        tx.commit().await?;
        Ok(saved)
    }
}

// =============================================================================
// In-memory
// =============================================================================

#[derive(Debug, Clone)]
struct MemoryRow {
    id: LineItemId,
    product_id: ProductId,
    quantity: u32,
    meta_data: Option<String>,
}

/// In-memory cart store. Cheap to clone; all clones share state.
#[derive(Clone, Default)]
pub struct MemoryCartStore {
    inner: Arc<MemoryCartStoreInner>,
}

#[derive(Default)]
struct MemoryCartStoreInner {
    carts: RwLock<HashMap<String, Vec<MemoryRow>>>,
    next_id: AtomicI32,
}

impl MemoryCartStore {
    fn load(&self, session: &SessionId) -> Result<Vec<LineItem>, StoreError> {
        let carts = self
            .inner
            .carts
            .read()
            .unwrap_or_else(PoisonError::into_inner);

        let rows = carts
            .get(session.as_str())
            .ok_or_else(|| StoreError::NotFound(format!("session {session}")))?;

        Ok(rows
            .iter()
            .map(|row| LineItem {
                id: Some(row.id),
                product_id: row.product_id,
                quantity: row.quantity,
                meta: LineItemMeta::from_meta_data(row.meta_data.as_deref()),
                product: None,
            })
            .collect())
    }

    fn save(
        &self,
        session: &SessionId,
        items: Vec<LineItem>,
    ) -> Result<Vec<LineItem>, StoreError> {
        let mut saved = Vec::with_capacity(items.len());
        let mut rows = Vec::with_capacity(items.len());

        for mut item in items {
            let id = item.id.unwrap_or_else(|| {
                LineItemId::new(self.inner.next_id.fetch_add(1, Ordering::Relaxed) + 1)
            });
            item.id = Some(id);
            rows.push(MemoryRow {
                id,
                product_id: item.product_id,
                quantity: item.quantity,
                meta_data: item.meta.to_meta_data(),
            });
            saved.push(item);
        }

        self.inner
            .carts
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(session.as_str().to_owned(), rows);

        Ok(saved)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn item(product_id: i32, quantity: u32, weight: Option<&str>) -> LineItem {
        LineItem {
            id: None,
            product_id: ProductId::new(product_id),
            quantity,
            meta: LineItemMeta::for_weight(weight),
            product: None,
        }
    }

    #[tokio::test]
    async fn test_unknown_session_is_not_found() {
        let store = CartStore::memory();
        let err = store.load(&SessionId::new("ghost")).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_save_assigns_ids_and_roundtrips() {
        let store = CartStore::memory();
        let session = store.issue_session_id();

        let saved = store
            .save(&session, vec![item(1, 2, Some("500g")), item(2, 1, None)])
            .await
            .unwrap();
        assert!(saved.iter().all(|i| i.id.is_some()));
        assert_ne!(saved[0].id, saved[1].id);

        let loaded = store.load(&session).await.unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].meta.normalized_weight(), Some("500g"));
        assert_eq!(loaded[1].quantity, 1);
    }

    #[tokio::test]
    async fn test_save_preserves_existing_ids() {
        let store = CartStore::memory();
        let session = store.issue_session_id();

        let saved = store.save(&session, vec![item(1, 2, None)]).await.unwrap();
        let id = saved[0].id;

        let mut updated = saved;
        updated[0].quantity = 5;
        let saved = store.save(&session, updated).await.unwrap();
        assert_eq!(saved[0].id, id);
        assert_eq!(saved[0].quantity, 5);
    }

    #[tokio::test]
    async fn test_last_write_wins() {
        let store = CartStore::memory();
        let session = store.issue_session_id();

        store.save(&session, vec![item(1, 1, None)]).await.unwrap();
        store.save(&session, vec![item(2, 3, None)]).await.unwrap();

        let loaded = store.load(&session).await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].product_id, ProductId::new(2));
    }

    #[tokio::test]
    async fn test_issued_session_ids_are_unique() {
        let store = CartStore::memory();
        let a = store.issue_session_id();
        let b = store.issue_session_id();
        assert_ne!(a, b);
        assert!(!a.is_empty());
    }
}
