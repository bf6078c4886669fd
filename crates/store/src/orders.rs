use async_trait::async_trait;
use common::{OrderNo, ProductId, ShippingId, UserId};
use domain::{
    Money, Order, OrderLine, OrderRecord, OrderRepository, OrderStatus, PaymentType, StoreError,
};
use sqlx::{PgPool, Row, postgres::PgRow};

use crate::error::{count_column, insert_error, unavailable};

const ORDER_COLUMNS: &str = "order_no, user_id, shipping_id, payment_cents, payment_type, \
     postage_cents, status, payment_time, send_time, end_time, close_time, create_time, update_time";

/// PostgreSQL-backed order repository.
#[derive(Clone)]
pub struct PostgresOrderRepository {
    pool: PgPool,
}

impl PostgresOrderRepository {
    /// Creates a repository over the given pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_order(row: PgRow) -> Result<Order, StoreError> {
        let status_code: i16 = row.try_get("status").map_err(unavailable)?;
        let status = OrderStatus::from_code(status_code).ok_or_else(|| StoreError::Corrupt {
            entity: "order",
            reason: format!("unknown status {status_code}"),
        })?;
        let type_code: i16 = row.try_get("payment_type").map_err(unavailable)?;
        let payment_type = PaymentType::from_code(type_code).ok_or_else(|| StoreError::Corrupt {
            entity: "order",
            reason: format!("unknown payment type {type_code}"),
        })?;

        let record = OrderRecord {
            order_no: OrderNo::new(row.try_get("order_no").map_err(unavailable)?),
            user_id: UserId::new(row.try_get("user_id").map_err(unavailable)?),
            shipping_id: ShippingId::new(row.try_get("shipping_id").map_err(unavailable)?),
            payment: Money::from_cents(row.try_get("payment_cents").map_err(unavailable)?),
            payment_type,
            postage: Money::from_cents(row.try_get("postage_cents").map_err(unavailable)?),
            status,
            payment_time: row.try_get("payment_time").map_err(unavailable)?,
            send_time: row.try_get("send_time").map_err(unavailable)?,
            end_time: row.try_get("end_time").map_err(unavailable)?,
            close_time: row.try_get("close_time").map_err(unavailable)?,
            create_time: row.try_get("create_time").map_err(unavailable)?,
            update_time: row.try_get("update_time").map_err(unavailable)?,
        };
        Ok(record.into())
    }

    fn row_to_line(row: PgRow) -> Result<OrderLine, StoreError> {
        Ok(OrderLine {
            order_no: OrderNo::new(row.try_get("order_no").map_err(unavailable)?),
            user_id: UserId::new(row.try_get("user_id").map_err(unavailable)?),
            product_id: ProductId::new(row.try_get("product_id").map_err(unavailable)?),
            product_name: row.try_get("product_name").map_err(unavailable)?,
            product_image: row.try_get("product_image").map_err(unavailable)?,
            unit_price: Money::from_cents(row.try_get("unit_price_cents").map_err(unavailable)?),
            quantity: count_column(
                "order_line",
                "quantity",
                row.try_get("quantity").map_err(unavailable)?,
            )?,
            line_total: Money::from_cents(row.try_get("line_total_cents").map_err(unavailable)?),
            create_time: row.try_get("create_time").map_err(unavailable)?,
        })
    }
}

#[async_trait]
impl OrderRepository for PostgresOrderRepository {
    async fn insert(&self, order: &Order, lines: &[OrderLine]) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await.map_err(unavailable)?;

        sqlx::query(
            r#"
            INSERT INTO orders (order_no, user_id, shipping_id, payment_cents, payment_type,
                postage_cents, status, payment_time, send_time, end_time, close_time,
                create_time, update_time)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(order.order_no().get())
        .bind(order.user_id().get())
        .bind(order.shipping_id().get())
        .bind(order.payment().cents())
        .bind(order.payment_type().code())
        .bind(order.postage().cents())
        .bind(order.status().code())
        .bind(order.payment_time())
        .bind(order.send_time())
        .bind(order.end_time())
        .bind(order.close_time())
        .bind(order.create_time())
        .bind(order.update_time())
        .execute(&mut *tx)
        .await
        .map_err(|e| insert_error("order", order.order_no(), e))?;

        for line in lines {
            sqlx::query(
                r#"
                INSERT INTO order_lines (order_no, user_id, product_id, product_name,
                    product_image, unit_price_cents, quantity, line_total_cents, create_time)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                "#,
            )
            .bind(line.order_no.get())
            .bind(line.user_id.get())
            .bind(line.product_id.get())
            .bind(&line.product_name)
            .bind(&line.product_image)
            .bind(line.unit_price.cents())
            .bind(i64::from(line.quantity))
            .bind(line.line_total.cents())
            .bind(line.create_time)
            .execute(&mut *tx)
            .await
            .map_err(unavailable)?;
        }

        tx.commit().await.map_err(unavailable)?;
        Ok(())
    }

    async fn find_by_order_no(&self, order_no: OrderNo) -> Result<Option<Order>, StoreError> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE order_no = $1");
        let row = sqlx::query(&sql)
            .bind(order_no.get())
            .fetch_optional(&self.pool)
            .await
            .map_err(unavailable)?;

        row.map(Self::row_to_order).transpose()
    }

    async fn find_by_user(&self, user_id: UserId) -> Result<Vec<Order>, StoreError> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 ORDER BY seq");
        let rows = sqlx::query(&sql)
            .bind(user_id.get())
            .fetch_all(&self.pool)
            .await
            .map_err(unavailable)?;

        rows.into_iter().map(Self::row_to_order).collect()
    }

    async fn lines_for(&self, order_no: OrderNo) -> Result<Vec<OrderLine>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT order_no, user_id, product_id, product_name, product_image,
                unit_price_cents, quantity, line_total_cents, create_time
            FROM order_lines
            WHERE order_no = $1
            ORDER BY id
            "#,
        )
        .bind(order_no.get())
        .fetch_all(&self.pool)
        .await
        .map_err(unavailable)?;

        rows.into_iter().map(Self::row_to_line).collect()
    }

    async fn update_status(
        &self,
        order: &Order,
        expected: OrderStatus,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE orders
            SET status = $3, payment_time = $4, send_time = $5, end_time = $6,
                close_time = $7, update_time = $8
            WHERE order_no = $1 AND status = $2
            "#,
        )
        .bind(order.order_no().get())
        .bind(expected.code())
        .bind(order.status().code())
        .bind(order.payment_time())
        .bind(order.send_time())
        .bind(order.end_time())
        .bind(order.close_time())
        .bind(order.update_time())
        .execute(&self.pool)
        .await
        .map_err(unavailable)?;

        Ok(result.rows_affected() == 1)
    }
}
