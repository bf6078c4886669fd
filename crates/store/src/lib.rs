//! PostgreSQL storage for the storefront core.
//!
//! Each type implements one of the domain's storage ports over a shared
//! [`PgPool`]. [`PostgresStorage`] bundles them behind a single pool.

pub mod address;
pub mod cart;
pub mod catalog;
pub mod error;
pub mod orders;

pub use address::PostgresAddressBook;
pub use cart::PostgresCartStore;
pub use catalog::PostgresCatalog;
pub use error::SetupError;
pub use orders::PostgresOrderRepository;

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

/// All PostgreSQL-backed ports sharing one connection pool.
#[derive(Clone)]
pub struct PostgresStorage {
    pool: PgPool,
}

impl PostgresStorage {
    /// Connects to the database.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, SetupError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;
        tracing::info!(max_connections, "connected to database");
        Ok(Self { pool })
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<(), SetupError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    pub fn catalog(&self) -> PostgresCatalog {
        PostgresCatalog::new(self.pool.clone())
    }

    pub fn carts(&self) -> PostgresCartStore {
        PostgresCartStore::new(self.pool.clone())
    }

    pub fn orders(&self) -> PostgresOrderRepository {
        PostgresOrderRepository::new(self.pool.clone())
    }

    pub fn addresses(&self) -> PostgresAddressBook {
        PostgresAddressBook::new(self.pool.clone())
    }
}
