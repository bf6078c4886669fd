//! Domain error types.
//!
//! Business rule violations are raised where they are detected and travel
//! unchanged to the boundary adapter, which maps each one to its stable
//! code. Storage failures are kept apart so the adapter can report them as
//! the generic error code.

use thiserror::Error;

/// A business rule violation with a stable code and message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BusinessError {
    /// The caller has no valid session.
    #[error("user is not logged in")]
    NeedLogin,

    /// A request parameter failed validation.
    #[error("invalid parameter: {0}")]
    ParamError(String),

    /// The product exists but is not on sale.
    #[error("product is off sale or deleted")]
    ProductOffSaleOrDelete,

    /// The product does not exist.
    #[error("product does not exist")]
    ProductNotExist,

    /// Not enough stock to satisfy the requested quantity.
    #[error("insufficient product stock")]
    ProductStockError,

    /// The product is not present in the user's cart.
    #[error("product is not in the cart")]
    CartProductNotExist,

    /// The shipping address does not exist or belongs to another user.
    #[error("shipping address does not exist")]
    AddressNotExist,

    /// Checkout was requested with no selected cart lines.
    #[error("select at least one product before placing an order")]
    CartSelectedIsEmpty,

    /// The order does not exist or belongs to another user.
    #[error("order does not exist")]
    OrderNotExist,

    /// The order's current status does not allow the transition.
    #[error("order status does not allow this operation")]
    OrderStatusError,
}

impl BusinessError {
    /// Returns the stable numeric code reported to callers.
    pub fn code(&self) -> i32 {
        match self {
            BusinessError::NeedLogin => 3,
            BusinessError::ParamError(_) => 4,
            BusinessError::ProductOffSaleOrDelete => 7,
            BusinessError::ProductNotExist => 8,
            BusinessError::ProductStockError => 9,
            BusinessError::CartProductNotExist => 10,
            BusinessError::AddressNotExist => 11,
            BusinessError::CartSelectedIsEmpty => 12,
            BusinessError::OrderNotExist => 13,
            BusinessError::OrderStatusError => 14,
        }
    }

    /// Returns the symbolic name of the code.
    pub fn name(&self) -> &'static str {
        match self {
            BusinessError::NeedLogin => "NEED_LOGIN",
            BusinessError::ParamError(_) => "PARAM_ERROR",
            BusinessError::ProductOffSaleOrDelete => "PRODUCT_OFF_SALE_OR_DELETE",
            BusinessError::ProductNotExist => "PRODUCT_NOT_EXIST",
            BusinessError::ProductStockError => "PRODUCT_STOCK_ERROR",
            BusinessError::CartProductNotExist => "CART_PRODUCT_NOT_EXIST",
            BusinessError::AddressNotExist => "ADDRESS_NOT_EXIST",
            BusinessError::CartSelectedIsEmpty => "CART_SELECTED_IS_EMPTY",
            BusinessError::OrderNotExist => "ORDER_NOT_EXIST",
            BusinessError::OrderStatusError => "ORDER_STATUS_ERROR",
        }
    }

    /// Shorthand for a [`BusinessError::ParamError`].
    pub fn param(message: impl Into<String>) -> Self {
        BusinessError::ParamError(message.into())
    }
}

/// Infrastructure failures raised by storage ports.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing store could not be reached or rejected the statement.
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    /// A stored record could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A versioned write lost a race with a concurrent writer.
    #[error(
        "Concurrency conflict for {entity} {id}: expected version {expected}, found {actual}"
    )]
    ConcurrencyConflict {
        entity: &'static str,
        id: String,
        expected: i64,
        actual: i64,
    },

    /// A stored record holds a value the domain cannot represent.
    #[error("Corrupt {entity} record: {reason}")]
    Corrupt {
        entity: &'static str,
        reason: String,
    },

    /// An insert collided with an existing record.
    #[error("Duplicate {entity}: {id}")]
    Duplicate { entity: &'static str, id: String },
}

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// A business rule was violated.
    #[error(transparent)]
    Business(#[from] BusinessError),

    /// A storage port failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl DomainError {
    /// Returns the business error, if this is one.
    pub fn business(&self) -> Option<&BusinessError> {
        match self {
            DomainError::Business(err) => Some(err),
            DomainError::Store(_) => None,
        }
    }

    /// Returns true if this is the given business error.
    pub fn is(&self, expected: &BusinessError) -> bool {
        self.business() == Some(expected)
    }
}

/// Result type for domain operations.
pub type Result<T> = std::result::Result<T, DomainError>;
