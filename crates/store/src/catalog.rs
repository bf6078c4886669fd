use async_trait::async_trait;
use common::ProductId;
use domain::{Catalog, Money, Product, SaleStatus, StoreError};
use sqlx::{PgPool, Row, postgres::PgRow};

use crate::error::{count_column, unavailable};

/// PostgreSQL-backed catalog.
#[derive(Clone)]
pub struct PostgresCatalog {
    pool: PgPool,
}

impl PostgresCatalog {
    /// Creates a catalog over the given pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_product(row: PgRow) -> Result<Product, StoreError> {
        let code: i16 = row.try_get("status").map_err(unavailable)?;
        let status = SaleStatus::from_code(code).ok_or_else(|| StoreError::Corrupt {
            entity: "product",
            reason: format!("unknown status {code}"),
        })?;

        Ok(Product {
            id: ProductId::new(row.try_get("id").map_err(unavailable)?),
            category_id: row.try_get("category_id").map_err(unavailable)?,
            name: row.try_get("name").map_err(unavailable)?,
            subtitle: row.try_get("subtitle").map_err(unavailable)?,
            main_image: row.try_get("main_image").map_err(unavailable)?,
            price: Money::from_cents(row.try_get("price_cents").map_err(unavailable)?),
            stock: count_column("product", "stock", row.try_get("stock").map_err(unavailable)?)?,
            status,
            version: row.try_get("version").map_err(unavailable)?,
        })
    }

    async fn current_version(&self, id: ProductId) -> Result<Option<i64>, StoreError> {
        sqlx::query_scalar("SELECT version FROM products WHERE id = $1")
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await
            .map_err(unavailable)
    }
}

#[async_trait]
impl Catalog for PostgresCatalog {
    async fn find_by_id(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, category_id, name, subtitle, main_image, price_cents, stock, status, version
            FROM products
            WHERE id = $1
            "#,
        )
        .bind(id.get())
        .fetch_optional(&self.pool)
        .await
        .map_err(unavailable)?;

        row.map(Self::row_to_product).transpose()
    }

    async fn save(&self, product: &Product) -> Result<Product, StoreError> {
        let updated = sqlx::query(
            r#"
            UPDATE products
            SET category_id = $3, name = $4, subtitle = $5, main_image = $6,
                price_cents = $7, stock = $8, status = $9, version = version + 1
            WHERE id = $1 AND version = $2
            "#,
        )
        .bind(product.id.get())
        .bind(product.version)
        .bind(product.category_id)
        .bind(&product.name)
        .bind(&product.subtitle)
        .bind(&product.main_image)
        .bind(product.price.cents())
        .bind(i64::from(product.stock))
        .bind(product.status.code())
        .execute(&self.pool)
        .await
        .map_err(unavailable)?;

        if updated.rows_affected() == 1 {
            let mut stored = product.clone();
            stored.version += 1;
            return Ok(stored);
        }

        // A brand-new product at version 0 is inserted instead.
        if product.version == 0 {
            let inserted = sqlx::query(
                r#"
                INSERT INTO products
                    (id, category_id, name, subtitle, main_image, price_cents, stock, status, version)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 1)
                ON CONFLICT (id) DO NOTHING
                "#,
            )
            .bind(product.id.get())
            .bind(product.category_id)
            .bind(&product.name)
            .bind(&product.subtitle)
            .bind(&product.main_image)
            .bind(product.price.cents())
            .bind(i64::from(product.stock))
            .bind(product.status.code())
            .execute(&self.pool)
            .await
            .map_err(unavailable)?;

            if inserted.rows_affected() == 1 {
                let mut stored = product.clone();
                stored.version = 1;
                return Ok(stored);
            }
        }

        let actual = self.current_version(product.id).await?.unwrap_or(0);
        tracing::debug!(product_id = %product.id, expected = product.version, actual, "stale product write");
        Err(StoreError::ConcurrencyConflict {
            entity: "product",
            id: product.id.to_string(),
            expected: product.version,
            actual,
        })
    }
}
