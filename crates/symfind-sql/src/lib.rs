//! # symfind-sql
//!
//! Relational backend for symfind repositories.
//!
//! Compiled [`Query`](symfind_orm::Query) values are rendered with sea-query
//! for SQLite, PostgreSQL or MySQL, and executed against SQLite through sqlx.
//! Entity tables and associations come from a [`SchemaConfig`].
//!
//! ```ignore
//! let backend = SqlBackend::<Musician>::connect(&settings, "Musician").await?;
//! let repository = Repository::new(backend);
//!
//! let seniors = repository
//! 	.find_by(Criteria::new().term(">=age", 60), None, None, None)
//! 	.await?;
//! ```

pub mod backend;
pub mod coerce;
pub mod dialect;
pub mod error;
pub mod render;
pub mod schema;
pub mod settings;

pub use backend::{Record, SqlBackend};
pub use dialect::Dialect;
pub use error::{Result, SqlError};
pub use render::{SqlRenderer, equality_query};
pub use schema::SchemaConfig;
pub use settings::SqlSettings;
