//! Product catalog store.
//!
//! Postgres-backed in production with a moka read cache (5-minute TTL, like
//! any catalog page the cache staleness is acceptable), or in-memory for
//! local dev and tests. Admin writes go through `upsert`/`set_stock`, which
//! invalidate the cache.

use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use moka::future::Cache;
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::{PgPool, Row};

use millet_basket_core::ProductId;
use millet_basket_core::product::Product;

use super::StoreError;

/// Catalog storage, Postgres-backed or in-memory.
#[derive(Clone)]
pub enum ProductStore {
    Postgres(PgProductStore),
    Memory(MemoryProductStore),
}

/// Admin-supplied product fields; the id is assigned by the store, and
/// `in_stock` is derived from `stock_quantity` to keep them consistent.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDraft {
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    pub price: Decimal,
    #[serde(default)]
    pub compare_price: Option<Decimal>,
    #[serde(default)]
    pub weight_options: Vec<String>,
    #[serde(default)]
    pub weight_prices: Option<String>,
    #[serde(default)]
    pub stock_quantity: Option<u32>,
    #[serde(default)]
    pub reviews: Option<String>,
}

impl ProductDraft {
    fn into_product(self, id: ProductId) -> Product {
        // inStock must stay consistent with stockQuantity > 0.
        let in_stock = self.stock_quantity.is_none_or(|q| q > 0);
        Product {
            id,
            slug: self.slug,
            name: self.name,
            description: self.description,
            image_url: self.image_url,
            category: self.category,
            price: self.price,
            compare_price: self.compare_price,
            weight_options: self.weight_options,
            weight_prices: self.weight_prices,
            stock_quantity: self.stock_quantity,
            in_stock,
            reviews: self.reviews,
        }
    }
}

impl ProductStore {
    /// Postgres-backed store with a read cache.
    #[must_use]
    pub fn postgres(pool: PgPool) -> Self {
        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(Duration::from_secs(300)) // 5 minutes
            .build();
        Self::Postgres(PgProductStore { pool, cache })
    }

    /// In-memory store for local dev and tests.
    #[must_use]
    pub fn memory() -> Self {
        Self::Memory(MemoryProductStore::default())
    }

    /// Fetch a product by id.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] if no such product exists.
    pub async fn get(&self, id: ProductId) -> Result<Product, StoreError> {
        match self {
            Self::Postgres(store) => store.get(id).await,
            Self::Memory(store) => store.get(id),
        }
    }

    /// Fetch a product by slug.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] if no such product exists.
    pub async fn get_by_slug(&self, slug: &str) -> Result<Product, StoreError> {
        match self {
            Self::Postgres(store) => store.get_by_slug(slug).await,
            Self::Memory(store) => store.get_by_slug(slug),
        }
    }

    /// List the whole catalog, ordered by id.
    ///
    /// # Errors
    ///
    /// [`StoreError::Storage`] on backend failure.
    pub async fn list(&self) -> Result<Vec<Product>, StoreError> {
        match self {
            Self::Postgres(store) => store.list().await,
            Self::Memory(store) => Ok(store.list()),
        }
    }

    /// Insert or update (by slug) a product.
    ///
    /// # Errors
    ///
    /// [`StoreError::Storage`] on backend failure.
    pub async fn upsert(&self, draft: ProductDraft) -> Result<Product, StoreError> {
        match self {
            Self::Postgres(store) => store.upsert(draft).await,
            Self::Memory(store) => Ok(store.upsert(draft)),
        }
    }

    /// Set a product's stock, keeping `in_stock` consistent.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] if no such product exists.
    pub async fn set_stock(&self, id: ProductId, quantity: u32) -> Result<Product, StoreError> {
        match self {
            Self::Postgres(store) => store.set_stock(id, quantity).await,
            Self::Memory(store) => store.set_stock(id, quantity),
        }
    }
}

// =============================================================================
// Postgres
// =============================================================================

/// Product store backed by the `product` table.
#[derive(Clone)]
pub struct PgProductStore {
    pool: PgPool,
    cache: Cache<String, Product>,
}

impl PgProductStore {
    async fn get(&self, id: ProductId) -> Result<Product, StoreError> {
        let key = format!("id:{id}");
        if let Some(product) = self.cache.get(&key).await {
            return Ok(product);
        }

        let row = sqlx::query(&select_sql("WHERE id = $1"))
            .bind(id.as_i32())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("product {id}")))?;

        let product = product_from_row(&row)?;
        self.cache.insert(key, product.clone()).await;
        Ok(product)
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Product, StoreError> {
        let key = format!("slug:{slug}");
        if let Some(product) = self.cache.get(&key).await {
            return Ok(product);
        }

        let row = sqlx::query(&select_sql("WHERE slug = $1"))
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("product {slug}")))?;

        let product = product_from_row(&row)?;
        self.cache.insert(key, product.clone()).await;
        Ok(product)
    }

    async fn list(&self) -> Result<Vec<Product>, StoreError> {
        let rows = sqlx::query(&select_sql("ORDER BY id"))
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(product_from_row).collect()
    }

    async fn upsert(&self, draft: ProductDraft) -> Result<Product, StoreError> {
        let stock = draft
            .stock_quantity
            .map(i32::try_from)
            .transpose()
            .map_err(|e| StoreError::Storage(e.to_string()))?;
        let in_stock = draft.stock_quantity.is_none_or(|q| q > 0);
        let weight_options = serde_json::to_string(&draft.weight_options)
            .map_err(|e| StoreError::Storage(e.to_string()))?;

        let row = sqlx::query(
            "INSERT INTO product
                 (slug, name, description, image_url, category, price, compare_price,
                  weight_options, weight_prices, stock_quantity, in_stock, reviews)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
             ON CONFLICT (slug) DO UPDATE SET
                 name = EXCLUDED.name,
                 description = EXCLUDED.description,
                 image_url = EXCLUDED.image_url,
                 category = EXCLUDED.category,
                 price = EXCLUDED.price,
                 compare_price = EXCLUDED.compare_price,
                 weight_options = EXCLUDED.weight_options,
                 weight_prices = EXCLUDED.weight_prices,
                 stock_quantity = EXCLUDED.stock_quantity,
                 in_stock = EXCLUDED.in_stock,
                 reviews = EXCLUDED.reviews
             RETURNING id",
        )
        .bind(&draft.slug)
        .bind(&draft.name)
        .bind(&draft.description)
        .bind(&draft.image_url)
        .bind(&draft.category)
        .bind(draft.price)
        .bind(draft.compare_price)
        .bind(&weight_options)
        .bind(&draft.weight_prices)
        .bind(stock)
        .bind(in_stock)
        .bind(&draft.reviews)
        .fetch_one(&self.pool)
        .await?;

        self.cache.invalidate_all();
        Ok(draft.into_product(ProductId::new(row.get("id"))))
    }

    async fn set_stock(&self, id: ProductId, quantity: u32) -> Result<Product, StoreError> {
        let stock = i32::try_from(quantity).map_err(|e| StoreError::Storage(e.to_string()))?;
        let updated = sqlx::query(
            "UPDATE product SET stock_quantity = $1, in_stock = $2 WHERE id = $3",
        )
        .bind(stock)
        .bind(quantity > 0)
        .bind(id.as_i32())
        .execute(&self.pool)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("product {id}")));
        }

        self.cache.invalidate_all();
        self.get(id).await
    }
}

fn select_sql(clause: &str) -> String {
    format!(
        "SELECT id, slug, name, description, image_url, category, price, compare_price,
                weight_options, weight_prices, stock_quantity, in_stock, reviews
         FROM product {clause}"
    )
}

fn product_from_row(row: &sqlx::postgres::PgRow) -> Result<Product, StoreError> {
    let weight_options: Option<String> = row.get("weight_options");
    let weight_options: Vec<String> = weight_options
        .as_deref()
        .map(serde_json::from_str)
        .transpose()
        .map_err(|e| StoreError::Storage(format!("corrupt weight_options: {e}")))?
        .unwrap_or_default();

    let stock_quantity: Option<i32> = row.get("stock_quantity");
    let stock_quantity = stock_quantity
        .map(u32::try_from)
        .transpose()
        .map_err(|e| StoreError::Storage(format!("negative stock: {e}")))?;

    Ok(Product {
        id: ProductId::new(row.get("id")),
        slug: row.get("slug"),
        name: row.get("name"),
        description: row.get("description"),
        image_url: row.get("image_url"),
        category: row.get("category"),
        price: row.get("price"),
        compare_price: row.get("compare_price"),
        weight_options,
        weight_prices: row.get("weight_prices"),
        stock_quantity,
        in_stock: row.get("in_stock"),
        reviews: row.get("reviews"),
    })
}

// =============================================================================
// In-memory
// =============================================================================

/// In-memory product store. Cheap to clone; all clones share state.
#[derive(Clone, Default)]
pub struct MemoryProductStore {
    inner: Arc<MemoryProductStoreInner>,
}

#[derive(Default)]
struct MemoryProductStoreInner {
    products: RwLock<Vec<Product>>,
    next_id: AtomicI32,
}

impl MemoryProductStore {
    fn get(&self, id: ProductId) -> Result<Product, StoreError> {
        self.inner
            .products
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("product {id}")))
    }

    fn get_by_slug(&self, slug: &str) -> Result<Product, StoreError> {
        self.inner
            .products
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|p| p.slug == slug)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("product {slug}")))
    }

    fn list(&self) -> Vec<Product> {
        self.inner
            .products
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn upsert(&self, draft: ProductDraft) -> Product {
        let mut products = self
            .inner
            .products
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        let id = products
            .iter()
            .find(|p| p.slug == draft.slug)
            .map_or_else(
                || ProductId::new(self.inner.next_id.fetch_add(1, Ordering::Relaxed) + 1),
                |existing| existing.id,
            );

        let product = draft.into_product(id);
        products.retain(|p| p.id != id);
        products.push(product.clone());
        products.sort_by_key(|p| p.id);
        product
    }

    fn set_stock(&self, id: ProductId, quantity: u32) -> Result<Product, StoreError> {
        let mut products = self
            .inner
            .products
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        let product = products
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("product {id}")))?;

        product.stock_quantity = Some(quantity);
        product.in_stock = quantity > 0;
        Ok(product.clone())
    }
}
