//! Persistence backend interface
//!
//! The compiler only needs metadata while compiling; everything that touches
//! storage goes through [`Backend`]. Backend errors are returned to the caller
//! unchanged.

use async_trait::async_trait;
use symfind_core::{EntityMetadata, OrderBy, Value};

use crate::query::Query;

/// Access to entity metadata
pub trait MetadataProvider: Send + Sync {
	/// Metadata of the repository's root entity
	fn metadata(&self) -> &dyn EntityMetadata;

	/// Metadata of any entity reachable through associations
	fn metadata_for(&self, entity: &str) -> Option<&dyn EntityMetadata>;
}

/// Conjunction of `field = value` terms understood by every backend
///
/// A null value means `IS NULL`, an array value means `IN (...)`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EqualityFilter {
	terms: Vec<(String, Value)>,
}

impl EqualityFilter {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn push(&mut self, field: impl Into<String>, value: Value) {
		self.terms.push((field.into(), value));
	}

	pub fn terms(&self) -> &[(String, Value)] {
		&self.terms
	}

	pub fn is_empty(&self) -> bool {
		self.terms.is_empty()
	}
}

/// Relational backend executing compiled queries
#[async_trait]
pub trait Backend: MetadataProvider {
	type Entity: Send;
	type Error: std::error::Error + Send + Sync + 'static;

	/// Native equality find
	async fn find_by_equality(
		&self,
		filter: &EqualityFilter,
		order_by: &OrderBy,
		limit: Option<u64>,
		offset: Option<u64>,
	) -> Result<Vec<Self::Entity>, Self::Error>;

	/// Native equality count
	async fn count_by_equality(&self, filter: &EqualityFilter) -> Result<u64, Self::Error>;

	/// Execute a compiled query with an entity projection
	async fn fetch(&self, query: &Query) -> Result<Vec<Self::Entity>, Self::Error>;

	/// Execute a compiled query with a count projection
	async fn fetch_count(&self, query: &Query) -> Result<u64, Self::Error>;
}
