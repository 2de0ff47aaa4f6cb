//! # rolechat-db
//!
//! Persistence layer implementing the repository traits with PostgreSQL via SQLx.
//!
//! - Connection pool management and embedded SQL migrations
//! - Database models with SQLx `FromRow` derives
//! - Entity ↔ Model mappers
//! - Repository implementations
//! - A `LISTEN/NOTIFY` change feed
//!
//! ## Usage
//!
//! ```rust,ignore
//! use rolechat_db::{create_pool, run_migrations, DatabaseConfig, PgUserRepository};
//! use rolechat_core::traits::UserRepository;
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let pool = create_pool(&DatabaseConfig::default()).await?;
//!     run_migrations(&pool).await?;
//!     let users = PgUserRepository::new(pool);
//!     let everyone = users.list(None).await?;
//!     Ok(())
//! }
//! ```

pub mod change_feed;
pub mod mappers;
pub mod models;
pub mod pool;
pub mod repositories;

// Re-export commonly used types
pub use change_feed::{ChangeFeed, ChangeFeedConfig, CHANGE_CHANNEL};
pub use pool::{create_pool, run_migrations, DatabaseConfig, PgPool};
pub use repositories::{
    PgConversationRepository, PgGroupRepository, PgMessageRepository, PgPermissionRepository,
    PgUserRepository,
};
