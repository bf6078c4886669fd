use async_trait::async_trait;
use common::{ShippingId, UserId};
use domain::{AddressBook, Shipping, StoreError};
use sqlx::{PgPool, Row, postgres::PgRow};

use crate::error::{insert_error, unavailable};

const COLUMNS: &str = "id, user_id, receiver_name, receiver_phone, receiver_mobile, \
     receiver_province, receiver_city, receiver_district, receiver_address, receiver_zip";

/// PostgreSQL-backed address book.
#[derive(Clone)]
pub struct PostgresAddressBook {
    pool: PgPool,
}

impl PostgresAddressBook {
    /// Creates an address book over the given pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Stores a new address.
    pub async fn insert(&self, shipping: &Shipping) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO shippings (id, user_id, receiver_name, receiver_phone, receiver_mobile,
                receiver_province, receiver_city, receiver_district, receiver_address, receiver_zip)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(shipping.id.get())
        .bind(shipping.user_id.get())
        .bind(&shipping.receiver_name)
        .bind(&shipping.receiver_phone)
        .bind(&shipping.receiver_mobile)
        .bind(&shipping.receiver_province)
        .bind(&shipping.receiver_city)
        .bind(&shipping.receiver_district)
        .bind(&shipping.receiver_address)
        .bind(&shipping.receiver_zip)
        .execute(&self.pool)
        .await
        .map_err(|e| insert_error("shipping", shipping.id, e))?;

        Ok(())
    }

    fn row_to_shipping(row: PgRow) -> Result<Shipping, sqlx::Error> {
        Ok(Shipping {
            id: ShippingId::new(row.try_get("id")?),
            user_id: UserId::new(row.try_get("user_id")?),
            receiver_name: row.try_get("receiver_name")?,
            receiver_phone: row.try_get("receiver_phone")?,
            receiver_mobile: row.try_get("receiver_mobile")?,
            receiver_province: row.try_get("receiver_province")?,
            receiver_city: row.try_get("receiver_city")?,
            receiver_district: row.try_get("receiver_district")?,
            receiver_address: row.try_get("receiver_address")?,
            receiver_zip: row.try_get("receiver_zip")?,
        })
    }
}

#[async_trait]
impl AddressBook for PostgresAddressBook {
    async fn find_by_id_and_user(
        &self,
        id: ShippingId,
        user_id: UserId,
    ) -> Result<Option<Shipping>, StoreError> {
        let sql = format!("SELECT {COLUMNS} FROM shippings WHERE id = $1 AND user_id = $2");
        let row = sqlx::query(&sql)
            .bind(id.get())
            .bind(user_id.get())
            .fetch_optional(&self.pool)
            .await
            .map_err(unavailable)?;

        row.map(Self::row_to_shipping)
            .transpose()
            .map_err(unavailable)
    }

    async fn find_by_id(&self, id: ShippingId) -> Result<Option<Shipping>, StoreError> {
        let sql = format!("SELECT {COLUMNS} FROM shippings WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await
            .map_err(unavailable)?;

        row.map(Self::row_to_shipping)
            .transpose()
            .map_err(unavailable)
    }
}
