use async_trait::async_trait;
use common::{ProductId, UserId};
use domain::cart::cart_key;
use domain::{CartLine, CartLineUpdate, CartStore, MAX_LINE_QUANTITY, StoreError};
use sqlx::PgPool;

use crate::error::unavailable;

/// PostgreSQL-backed cart store.
///
/// Uses the `cart_hashes` table as a key/field/value hash: one row per
/// cart line, keyed by `cart_{user}` and the product id, with the line
/// stored as JSON. Single-row upserts and updates keep each operation
/// atomic without explicit locking.
#[derive(Clone)]
pub struct PostgresCartStore {
    pool: PgPool,
}

impl PostgresCartStore {
    /// Creates a cart store over the given pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn decode(value: serde_json::Value) -> Result<CartLine, StoreError> {
        Ok(serde_json::from_value(value)?)
    }
}

#[async_trait]
impl CartStore for PostgresCartStore {
    async fn lines(&self, user_id: UserId) -> Result<Vec<CartLine>, StoreError> {
        let values: Vec<serde_json::Value> =
            sqlx::query_scalar("SELECT value FROM cart_hashes WHERE hash_key = $1 ORDER BY field")
                .bind(cart_key(user_id))
                .fetch_all(&self.pool)
                .await
                .map_err(unavailable)?;

        values.into_iter().map(Self::decode).collect()
    }

    async fn line(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<Option<CartLine>, StoreError> {
        let value: Option<serde_json::Value> =
            sqlx::query_scalar("SELECT value FROM cart_hashes WHERE hash_key = $1 AND field = $2")
                .bind(cart_key(user_id))
                .bind(product_id.get())
                .fetch_optional(&self.pool)
                .await
                .map_err(unavailable)?;

        value.map(Self::decode).transpose()
    }

    async fn increment(
        &self,
        user_id: UserId,
        product_id: ProductId,
        delta: u32,
        selected: bool,
    ) -> Result<Option<CartLine>, StoreError> {
        if delta > MAX_LINE_QUANTITY {
            return Ok(None);
        }
        let fresh = serde_json::to_value(CartLine::new(product_id, delta, selected))?;

        // A conflicting row that would overflow the cap is left untouched and
        // yields no row.
        let value: Option<serde_json::Value> = sqlx::query_scalar(
            r#"
            INSERT INTO cart_hashes (hash_key, field, value)
            VALUES ($1, $2, $3)
            ON CONFLICT (hash_key, field) DO UPDATE
            SET value = jsonb_set(
                cart_hashes.value,
                '{quantity}',
                to_jsonb((cart_hashes.value->>'quantity')::bigint + $4)
            )
            WHERE (cart_hashes.value->>'quantity')::bigint + $4 <= $5
            RETURNING value
            "#,
        )
        .bind(cart_key(user_id))
        .bind(product_id.get())
        .bind(fresh)
        .bind(i64::from(delta))
        .bind(i64::from(MAX_LINE_QUANTITY))
        .fetch_optional(&self.pool)
        .await
        .map_err(unavailable)?;

        value.map(Self::decode).transpose()
    }

    async fn modify(
        &self,
        user_id: UserId,
        product_id: ProductId,
        update: CartLineUpdate,
    ) -> Result<Option<CartLine>, StoreError> {
        let mut tx = self.pool.begin().await.map_err(unavailable)?;

        let value: Option<serde_json::Value> = sqlx::query_scalar(
            "SELECT value FROM cart_hashes WHERE hash_key = $1 AND field = $2 FOR UPDATE",
        )
        .bind(cart_key(user_id))
        .bind(product_id.get())
        .fetch_optional(&mut *tx)
        .await
        .map_err(unavailable)?;

        let Some(value) = value else {
            return Ok(None);
        };

        let mut line = Self::decode(value)?;
        update.apply_to(&mut line);

        sqlx::query("UPDATE cart_hashes SET value = $3 WHERE hash_key = $1 AND field = $2")
            .bind(cart_key(user_id))
            .bind(product_id.get())
            .bind(serde_json::to_value(line)?)
            .execute(&mut *tx)
            .await
            .map_err(unavailable)?;

        tx.commit().await.map_err(unavailable)?;
        Ok(Some(line))
    }

    async fn set_all_selected(&self, user_id: UserId, selected: bool) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE cart_hashes
            SET value = jsonb_set(value, '{productSelected}', to_jsonb($2::boolean))
            WHERE hash_key = $1
            "#,
        )
        .bind(cart_key(user_id))
        .bind(selected)
        .execute(&self.pool)
        .await
        .map_err(unavailable)?;

        Ok(())
    }

    async fn remove(
        &self,
        user_id: UserId,
        product_ids: &[ProductId],
    ) -> Result<usize, StoreError> {
        let fields: Vec<i64> = product_ids.iter().map(|id| id.get()).collect();

        let result = sqlx::query("DELETE FROM cart_hashes WHERE hash_key = $1 AND field = ANY($2)")
            .bind(cart_key(user_id))
            .bind(fields)
            .execute(&self.pool)
            .await
            .map_err(unavailable)?;

        Ok(result.rows_affected() as usize)
    }

    async fn restore(&self, user_id: UserId, line: &CartLine) -> Result<CartLine, StoreError> {
        let value: serde_json::Value = sqlx::query_scalar(
            r#"
            INSERT INTO cart_hashes (hash_key, field, value)
            VALUES ($1, $2, $3)
            ON CONFLICT (hash_key, field) DO UPDATE
            SET value = jsonb_set(
                cart_hashes.value,
                '{quantity}',
                to_jsonb(LEAST((cart_hashes.value->>'quantity')::bigint + $4, $5))
            )
            RETURNING value
            "#,
        )
        .bind(cart_key(user_id))
        .bind(line.product_id.get())
        .bind(serde_json::to_value(line)?)
        .bind(i64::from(line.quantity))
        .bind(i64::from(MAX_LINE_QUANTITY))
        .fetch_one(&self.pool)
        .await
        .map_err(unavailable)?;

        Self::decode(value)
    }
}
