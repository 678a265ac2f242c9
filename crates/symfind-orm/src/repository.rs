//! Entity repository with symbolic find
//!
//! ```ignore
//! let repository = Repository::new(backend);
//!
//! let musicians = repository
//! 	.find_by(
//! 		Criteria::new()
//! 			.term("(|city", "Berlin")
//! 			.term("city", "Hamburg")
//! 			.term(")", true)
//! 			.term(">=instruments.name@COUNT(%s)", 2),
//! 		Some(OrderBy::new().asc("name")),
//! 		None,
//! 		None,
//! 	)
//! 	.await?;
//! ```

use symfind_core::OrderBy;
use tracing::debug;

use crate::assembler::assemble;
use crate::backend::Backend;
use crate::criteria::{Criteria, CriteriaOptions, SearchRequest};
use crate::error::{FindError, FindResult};
use crate::fast_path::equality_filter;
use crate::parts::QueryParts;
use crate::query::{Projection, Query};
use crate::settings::RepositorySettings;

/// Repository of the root entity of `B`
pub struct Repository<B: Backend> {
	backend: B,
	settings: RepositorySettings,
}

impl<B: Backend> Repository<B> {
	pub fn new(backend: B) -> Self {
		Self::with_settings(backend, RepositorySettings::default())
	}

	pub fn with_settings(backend: B, settings: RepositorySettings) -> Self {
		Self { backend, settings }
	}

	pub fn backend(&self) -> &B {
		&self.backend
	}

	pub fn settings(&self) -> &RepositorySettings {
		&self.settings
	}

	/// Parse and resolve criteria without compiling them
	pub fn prepare(&self, criteria: Criteria, order_by: &OrderBy) -> Result<QueryParts, FindError<B::Error>> {
		Ok(QueryParts::prepare(criteria, order_by, &self.backend)?)
	}

	/// Compile criteria into the query the general path would execute
	pub fn compile(
		&self,
		criteria: Criteria,
		order_by: Option<&OrderBy>,
		limit: Option<u64>,
		offset: Option<u64>,
		projection: Projection,
	) -> Result<Query, FindError<B::Error>> {
		let empty = OrderBy::new();
		let parts = self.prepare(criteria, order_by.unwrap_or(&empty))?;
		Ok(assemble(parts, projection, limit, offset, &self.backend)?)
	}

	/// Find all entities matching `criteria`
	pub async fn find_by(
		&self,
		criteria: Criteria,
		order_by: Option<OrderBy>,
		limit: Option<u64>,
		offset: Option<u64>,
	) -> FindResult<Vec<B::Entity>, B::Error> {
		let order_by = order_by.unwrap_or_default();
		let parts = self.prepare(criteria, &order_by)?;

		if self.settings.fast_path {
			if let Some(filter) = equality_filter(&parts, &self.backend) {
				debug!(terms = filter.terms().len(), "find_by: native equality find");
				return self
					.backend
					.find_by_equality(&filter, &order_by, limit, offset)
					.await
					.map_err(FindError::Backend);
			}
		}

		let query = assemble(parts, Projection::Entity, limit, offset, &self.backend)?;
		debug!(entity = query.entity(), "find_by: compiled query");
		self.backend.fetch(&query).await.map_err(FindError::Backend)
	}

	/// The first entity matching `criteria`
	pub async fn find_one_by(
		&self,
		criteria: Criteria,
		order_by: Option<OrderBy>,
	) -> FindResult<Option<B::Entity>, B::Error> {
		let found = self.find_by(criteria, order_by, Some(1), Some(0)).await?;
		Ok(found.into_iter().next())
	}

	/// Number of distinct root entities matching `criteria`
	pub async fn count(&self, criteria: Criteria) -> FindResult<u64, B::Error> {
		let parts = self.prepare(criteria, &OrderBy::new())?;

		if self.settings.fast_path {
			if let Some(filter) = equality_filter(&parts, &self.backend) {
				debug!(terms = filter.terms().len(), "count: native equality count");
				return self
					.backend
					.count_by_equality(&filter)
					.await
					.map_err(FindError::Backend);
			}
		}

		let query = assemble(parts, Projection::CountDistinctRoot, None, None, &self.backend)?;
		self.backend.fetch_count(&query).await.map_err(FindError::Backend)
	}

	/// [`find_by`](Self::find_by) with wildcard interpretation switched on
	pub async fn find_like(
		&self,
		criteria: Criteria,
		order_by: Option<OrderBy>,
		limit: Option<u64>,
		offset: Option<u64>,
	) -> FindResult<Vec<B::Entity>, B::Error> {
		let criteria = criteria.with_options(CriteriaOptions::wildcards());
		self.find_by(criteria, order_by, limit, offset).await
	}

	/// The single entity matching `criteria` with wildcards switched on
	///
	/// Only one row is requested; `None` unless exactly one came back.
	pub async fn find_one_like(&self, criteria: Criteria) -> FindResult<Option<B::Entity>, B::Error> {
		let mut found = self.find_like(criteria, None, Some(1), None).await?;
		if found.len() == 1 { Ok(found.pop()) } else { Ok(None) }
	}

	/// Run a decoded listing request
	pub async fn search(&self, request: SearchRequest) -> FindResult<Vec<B::Entity>, B::Error> {
		let order_by = (!request.order_by.is_empty()).then_some(request.order_by);
		self.find_by(request.criteria, order_by, request.limit, request.offset)
			.await
	}
}
