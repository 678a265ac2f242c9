//! # Symfind
//!
//! Symbolic find for entity repositories.
//!
//! Criteria are written as ordered `(key, value)` pairs where the key carries
//! its own operators: groups, negation, comparators, association paths,
//! inline functions, aggregates and declared parameter types. Symfind compiles
//! them into a backend-neutral query and hands it to a [`Backend`].
//!
//! ```ignore
//! use symfind::prelude::*;
//!
//! let repository = Repository::new(SqlBackend::<Musician>::connect(&settings, "Musician").await?);
//!
//! let found = repository
//! 	.find_by(
//! 		Criteria::new()
//! 			.term("(|city", "Berlin")
//! 			.term("city", "Hamburg")
//! 			.term(")", true)
//! 			.term("!instruments.name", "drums"),
//! 		Some(OrderBy::new().asc("name")),
//! 		Some(20),
//! 		None,
//! 	)
//! 	.await?;
//! ```
//!
//! ## Crates
//!
//! - [`core`]: values, conditions, orderings and entity metadata
//! - [`orm`]: the criteria compiler and [`Repository`]
//! - [`sql`] (feature `sql`, default): sea-query rendering and SQLite execution

pub use symfind_core as core;
pub use symfind_orm as orm;
#[cfg(feature = "sql")]
pub use symfind_sql as sql;

pub use symfind_core::{
	BackedEnum, Comparator, Condition, CriteriaError, Direction, EntityDescriptor, EntityMetadata,
	FieldRef, FieldType, OrderBy, Value,
};
pub use symfind_orm::{
	Backend, Criteria, Criterion, FindError, FindResult, MetadataProvider, Query, Repository,
	RepositorySettings, SearchRequest, SelectableCriteria,
};

pub mod prelude {
	pub use crate::{
		Backend, Criteria, Criterion, Direction, FindError, OrderBy, Repository, SearchRequest, Value,
	};

	#[cfg(feature = "sql")]
	pub use symfind_sql::{SchemaConfig, SqlBackend, SqlSettings};
}
