//! Query parts shared by the compilation phases

use indexmap::IndexMap;
use symfind_core::{CriteriaError, Direction, FieldRef, OrderBy};

use crate::backend::MetadataProvider;
use crate::criteria::{Criteria, CriteriaOptions, SelectableCriteria};
use crate::criterion::Criterion;
use crate::parser::parse_criteria;
use crate::resolver::{JoinDescriptor, ROOT_ALIAS, resolve};

/// Everything one call needs to build its query
///
/// Built once per call; compilation only annotates `literal` and the value
/// of individual criteria.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryParts {
	pub options: CriteriaOptions,
	pub where_criteria: Vec<Criterion>,
	pub having_criteria: Vec<Criterion>,
	/// Ordering with `INDEX` entries removed and fields alias-qualified
	pub order_by: Vec<(FieldRef, Direction)>,
	pub joins: Vec<JoinDescriptor>,
	pub index_by: IndexMap<String, String>,
	pub selectable: Vec<SelectableCriteria>,
	/// Entity behind each alias, as far as metadata could resolve it
	pub alias_entities: IndexMap<String, String>,
}

impl QueryParts {
	/// Parse `criteria` and `order_by` and resolve their associations
	pub fn prepare(
		criteria: Criteria,
		order_by: &OrderBy,
		metadata: &dyn MetadataProvider,
	) -> Result<Self, CriteriaError> {
		let parsed = parse_criteria(criteria)?;
		let resolution = resolve(parsed.all(), order_by);

		let mut alias_entities = IndexMap::new();
		alias_entities.insert(ROOT_ALIAS.to_string(), metadata.metadata().entity_name().to_string());
		for join in resolution.joins.values() {
			let target = alias_entities
				.get(&join.parent)
				.and_then(|parent| metadata.metadata_for(parent))
				.and_then(|parent| parent.association_target(&join.association))
				.map(str::to_string);
			if let Some(target) = target {
				alias_entities.insert(join.alias.clone(), target);
			}
		}

		Ok(Self {
			options: parsed.options,
			where_criteria: parsed.where_criteria,
			having_criteria: parsed.having_criteria,
			order_by: resolution.order_by,
			joins: resolution.joins.into_values().collect(),
			index_by: resolution.index_by,
			selectable: parsed.selectable,
			alias_entities,
		})
	}

	pub fn criteria(&self) -> impl Iterator<Item = &Criterion> {
		self.where_criteria.iter().chain(self.having_criteria.iter())
	}
}
