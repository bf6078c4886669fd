//! Address gateway: read-only access to users' shipping addresses.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::{ShippingId, UserId};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::StoreError;

/// A shipping address owned by a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shipping {
    pub id: ShippingId,
    pub user_id: UserId,
    pub receiver_name: String,
    pub receiver_phone: String,
    pub receiver_mobile: String,
    pub receiver_province: String,
    pub receiver_city: String,
    pub receiver_district: String,
    pub receiver_address: String,
    pub receiver_zip: String,
}

impl Shipping {
    /// Creates an address with only the receiver name and street set.
    pub fn new(
        id: ShippingId,
        user_id: UserId,
        receiver_name: impl Into<String>,
        receiver_address: impl Into<String>,
    ) -> Self {
        Self {
            id,
            user_id,
            receiver_name: receiver_name.into(),
            receiver_phone: String::new(),
            receiver_mobile: String::new(),
            receiver_province: String::new(),
            receiver_city: String::new(),
            receiver_district: String::new(),
            receiver_address: receiver_address.into(),
            receiver_zip: String::new(),
        }
    }
}

/// Storage port for shipping addresses.
#[async_trait]
pub trait AddressBook: Send + Sync {
    /// Loads an address only if it belongs to `user_id`.
    async fn find_by_id_and_user(
        &self,
        id: ShippingId,
        user_id: UserId,
    ) -> Result<Option<Shipping>, StoreError>;

    /// Loads an address by id.
    async fn find_by_id(&self, id: ShippingId) -> Result<Option<Shipping>, StoreError>;
}

/// In-memory address book for tests and local runs.
#[derive(Clone, Default)]
pub struct InMemoryAddressBook {
    addresses: Arc<RwLock<HashMap<ShippingId, Shipping>>>,
}

impl InMemoryAddressBook {
    /// Creates an empty address book.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces an address.
    pub async fn insert(&self, shipping: Shipping) {
        self.addresses.write().await.insert(shipping.id, shipping);
    }
}

#[async_trait]
impl AddressBook for InMemoryAddressBook {
    async fn find_by_id_and_user(
        &self,
        id: ShippingId,
        user_id: UserId,
    ) -> Result<Option<Shipping>, StoreError> {
        Ok(self
            .addresses
            .read()
            .await
            .get(&id)
            .filter(|s| s.user_id == user_id)
            .cloned())
    }

    async fn find_by_id(&self, id: ShippingId) -> Result<Option<Shipping>, StoreError> {
        Ok(self.addresses.read().await.get(&id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_lookup_is_scoped_to_owner() {
        let book = InMemoryAddressBook::new();
        book.insert(Shipping::new(
            ShippingId::new(1),
            UserId::new(10),
            "Ada",
            "1 Analytical Way",
        ))
        .await;

        let own = book
            .find_by_id_and_user(ShippingId::new(1), UserId::new(10))
            .await
            .unwrap();
        assert!(own.is_some());

        let other = book
            .find_by_id_and_user(ShippingId::new(1), UserId::new(11))
            .await
            .unwrap();
        assert!(other.is_none());

        assert!(book.find_by_id(ShippingId::new(1)).await.unwrap().is_some());
    }
}
