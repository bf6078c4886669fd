//! Cart store port and its in-memory key/value implementation.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use common::{ProductId, UserId};
use tokio::sync::RwLock;

use super::{CartLine, CartLineUpdate, MAX_LINE_QUANTITY};
use crate::error::StoreError;

/// Returns the key of a user's cart hash.
pub fn cart_key(user_id: UserId) -> String {
    format!("cart_{user_id}")
}

/// Storage port for carts.
///
/// Each user's cart is a hash keyed by product id. Every method touches a
/// single user's hash, so different users never contend with each other.
/// Read-modify-write operations (`increment`, `modify`, `set_all_selected`)
/// are atomic per user so concurrent requests cannot lose updates.
#[async_trait]
pub trait CartStore: Send + Sync {
    /// Returns all lines of a user's cart ordered by product id.
    async fn lines(&self, user_id: UserId) -> Result<Vec<CartLine>, StoreError>;

    /// Returns one line, if present.
    async fn line(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<Option<CartLine>, StoreError>;

    /// Adds `delta` to an existing line, or creates it with `delta` and
    /// `selected`. An existing line keeps its selection flag.
    ///
    /// Returns `None`, writing nothing, when the resulting quantity would
    /// exceed [`MAX_LINE_QUANTITY`].
    async fn increment(
        &self,
        user_id: UserId,
        product_id: ProductId,
        delta: u32,
        selected: bool,
    ) -> Result<Option<CartLine>, StoreError>;

    /// Applies a partial update to an existing line.
    ///
    /// Returns `None` if the line does not exist.
    async fn modify(
        &self,
        user_id: UserId,
        product_id: ProductId,
        update: CartLineUpdate,
    ) -> Result<Option<CartLine>, StoreError>;

    /// Sets the selection flag of every line in the cart.
    async fn set_all_selected(&self, user_id: UserId, selected: bool) -> Result<(), StoreError>;

    /// Removes the given lines, returning how many existed.
    async fn remove(&self, user_id: UserId, product_ids: &[ProductId])
    -> Result<usize, StoreError>;

    /// Merges a previously removed line back into the cart.
    ///
    /// If the product has been added again meanwhile, the quantities add up
    /// (capped at [`MAX_LINE_QUANTITY`]) and the current selection flag is
    /// kept. Otherwise the line is written as-is.
    async fn restore(&self, user_id: UserId, line: &CartLine) -> Result<CartLine, StoreError>;
}

type CartHash = BTreeMap<ProductId, String>;

/// In-memory cart store.
///
/// Mirrors a key/value hash layout: one hash per `cart_{user}` key, one
/// field per product id, each value a JSON-encoded [`CartLine`].
#[derive(Clone, Default)]
pub struct InMemoryCartStore {
    hashes: Arc<RwLock<HashMap<String, CartHash>>>,
}

impl InMemoryCartStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn decode(value: &str) -> Result<CartLine, StoreError> {
        Ok(serde_json::from_str(value)?)
    }

    fn encode(line: &CartLine) -> Result<String, StoreError> {
        Ok(serde_json::to_string(line)?)
    }
}

#[async_trait]
impl CartStore for InMemoryCartStore {
    async fn lines(&self, user_id: UserId) -> Result<Vec<CartLine>, StoreError> {
        let hashes = self.hashes.read().await;
        match hashes.get(&cart_key(user_id)) {
            Some(hash) => hash.values().map(|v| Self::decode(v)).collect(),
            None => Ok(Vec::new()),
        }
    }

    async fn line(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<Option<CartLine>, StoreError> {
        let hashes = self.hashes.read().await;
        hashes
            .get(&cart_key(user_id))
            .and_then(|hash| hash.get(&product_id))
            .map(|v| Self::decode(v))
            .transpose()
    }

    async fn increment(
        &self,
        user_id: UserId,
        product_id: ProductId,
        delta: u32,
        selected: bool,
    ) -> Result<Option<CartLine>, StoreError> {
        let mut hashes = self.hashes.write().await;
        let hash = hashes.entry(cart_key(user_id)).or_default();

        let mut line = match hash.get(&product_id) {
            Some(value) => Self::decode(value)?,
            None => CartLine::new(product_id, 0, selected),
        };
        match line.quantity.checked_add(delta) {
            Some(quantity) if quantity <= MAX_LINE_QUANTITY => line.quantity = quantity,
            _ => {
                if hash.is_empty() {
                    hashes.remove(&cart_key(user_id));
                }
                return Ok(None);
            }
        }

        hash.insert(product_id, Self::encode(&line)?);
        Ok(Some(line))
    }

    async fn modify(
        &self,
        user_id: UserId,
        product_id: ProductId,
        update: CartLineUpdate,
    ) -> Result<Option<CartLine>, StoreError> {
        let mut hashes = self.hashes.write().await;
        let Some(value) = hashes
            .get_mut(&cart_key(user_id))
            .and_then(|hash| hash.get_mut(&product_id))
        else {
            return Ok(None);
        };

        let mut line = Self::decode(value)?;
        update.apply_to(&mut line);
        *value = Self::encode(&line)?;
        Ok(Some(line))
    }

    async fn set_all_selected(&self, user_id: UserId, selected: bool) -> Result<(), StoreError> {
        let mut hashes = self.hashes.write().await;
        if let Some(hash) = hashes.get_mut(&cart_key(user_id)) {
            for value in hash.values_mut() {
                let mut line = Self::decode(value)?;
                line.selected = selected;
                *value = Self::encode(&line)?;
            }
        }
        Ok(())
    }

    async fn remove(
        &self,
        user_id: UserId,
        product_ids: &[ProductId],
    ) -> Result<usize, StoreError> {
        let mut hashes = self.hashes.write().await;
        let key = cart_key(user_id);
        let Some(hash) = hashes.get_mut(&key) else {
            return Ok(0);
        };

        let removed = product_ids
            .iter()
            .filter(|id| hash.remove(id).is_some())
            .count();
        if hash.is_empty() {
            hashes.remove(&key);
        }
        Ok(removed)
    }

    async fn restore(&self, user_id: UserId, line: &CartLine) -> Result<CartLine, StoreError> {
        let mut hashes = self.hashes.write().await;
        let hash = hashes.entry(cart_key(user_id)).or_default();

        let merged = match hash.get(&line.product_id) {
            Some(value) => {
                let mut current = Self::decode(value)?;
                current.quantity = current
                    .quantity
                    .saturating_add(line.quantity)
                    .min(MAX_LINE_QUANTITY);
                current
            }
            None => *line,
        };

        hash.insert(line.product_id, Self::encode(&merged)?);
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const USER: UserId = UserId::new(1);
    const P7: ProductId = ProductId::new(7);
    const P9: ProductId = ProductId::new(9);

    #[tokio::test]
    async fn test_increment_upserts() {
        let store = InMemoryCartStore::new();

        let line = store.increment(USER, P7, 1, true).await.unwrap();
        assert_eq!(line, Some(CartLine::new(P7, 1, true)));

        let line = store.increment(USER, P7, 1, false).await.unwrap().unwrap();
        assert_eq!(line, CartLine::new(P7, 2, true));

        assert_eq!(store.lines(USER).await.unwrap(), vec![line]);
    }

    #[tokio::test]
    async fn test_lines_are_ordered_by_product_id() {
        let store = InMemoryCartStore::new();
        store.increment(USER, P9, 1, true).await.unwrap();
        store.increment(USER, P7, 1, true).await.unwrap();

        let ids: Vec<_> = store
            .lines(USER)
            .await
            .unwrap()
            .into_iter()
            .map(|l| l.product_id)
            .collect();
        assert_eq!(ids, vec![P7, P9]);
    }

    #[tokio::test]
    async fn test_carts_are_isolated_per_user() {
        let store = InMemoryCartStore::new();
        store.increment(USER, P7, 3, true).await.unwrap();

        assert!(store.lines(UserId::new(2)).await.unwrap().is_empty());
        assert!(store.line(UserId::new(2), P7).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_modify_missing_line_returns_none() {
        let store = InMemoryCartStore::new();
        let result = store
            .modify(USER, P7, CartLineUpdate::default())
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_remove_then_restore_line() {
        let store = InMemoryCartStore::new();
        let line = store.increment(USER, P7, 2, true).await.unwrap().unwrap();
        store.increment(USER, P9, 1, false).await.unwrap();

        assert_eq!(store.remove(USER, &[P7, ProductId::new(99)]).await.unwrap(), 1);
        assert!(store.line(USER, P7).await.unwrap().is_none());

        assert_eq!(store.restore(USER, &line).await.unwrap(), line);
        assert_eq!(store.line(USER, P7).await.unwrap(), Some(line));
    }

    #[tokio::test]
    async fn test_restore_merges_with_line_added_meanwhile() {
        let store = InMemoryCartStore::new();
        let drained = CartLine::new(P7, 2, true);
        store.increment(USER, P7, 1, false).await.unwrap();

        let merged = store.restore(USER, &drained).await.unwrap();

        assert_eq!(merged, CartLine::new(P7, 3, false));
        assert_eq!(store.line(USER, P7).await.unwrap(), Some(merged));
    }

    #[tokio::test]
    async fn test_increment_never_exceeds_line_cap() {
        let store = InMemoryCartStore::new();
        store
            .increment(USER, P7, MAX_LINE_QUANTITY - 1, true)
            .await
            .unwrap();

        assert!(store.increment(USER, P7, 2, true).await.unwrap().is_none());
        assert!(store.increment(USER, P7, u32::MAX, true).await.unwrap().is_none());
        assert!(store.increment(USER, P9, MAX_LINE_QUANTITY + 1, true).await.unwrap().is_none());

        let lines = store.lines(USER).await.unwrap();
        assert_eq!(lines, vec![CartLine::new(P7, MAX_LINE_QUANTITY - 1, true)]);

        let full = store.increment(USER, P7, 1, true).await.unwrap().unwrap();
        assert_eq!(full.quantity, MAX_LINE_QUANTITY);
    }

    #[tokio::test]
    async fn test_restore_is_capped() {
        let store = InMemoryCartStore::new();
        store.increment(USER, P7, MAX_LINE_QUANTITY, true).await.unwrap();

        let merged = store.restore(USER, &CartLine::new(P7, 5, true)).await.unwrap();
        assert_eq!(merged.quantity, MAX_LINE_QUANTITY);
    }

    #[tokio::test]
    async fn test_set_all_selected() {
        let store = InMemoryCartStore::new();
        store.increment(USER, P7, 1, false).await.unwrap();
        store.increment(USER, P9, 1, true).await.unwrap();

        store.set_all_selected(USER, true).await.unwrap();
        assert!(store.lines(USER).await.unwrap().iter().all(|l| l.selected));

        store.set_all_selected(USER, false).await.unwrap();
        assert!(store.lines(USER).await.unwrap().iter().all(|l| !l.selected));
    }

    #[tokio::test]
    async fn test_concurrent_increments_are_not_lost() {
        let store = InMemoryCartStore::new();
        let mut handles = Vec::new();
        for _ in 0..20 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.increment(USER, P7, 1, true).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(store.line(USER, P7).await.unwrap().unwrap().quantity, 20);
    }
}
