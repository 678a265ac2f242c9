//! Fast-path guard
//!
//! Criteria that amount to a conjunction of plain equalities on root fields are
//! handed to the backend's native equality find instead of being compiled.

use symfind_core::Value;

use crate::backend::{EqualityFilter, MetadataProvider};
use crate::compiler::contains_wildcards;
use crate::criterion::Criterion;
use crate::parts::QueryParts;

/// The equality filter equivalent to `parts`, if there is one
pub fn equality_filter(parts: &QueryParts, metadata: &dyn MetadataProvider) -> Option<EqualityFilter> {
	if !parts.joins.is_empty()
		|| !parts.index_by.is_empty()
		|| !parts.selectable.is_empty()
		|| !parts.having_criteria.is_empty()
	{
		return None;
	}
	let mut filter = EqualityFilter::new();
	for criterion in &parts.where_criteria {
		if !is_plain_equality(criterion, parts.options.wildcards, metadata) {
			return None;
		}
		filter.push(criterion.field.clone(), criterion.value.clone());
	}
	Some(filter)
}

fn is_plain_equality(criterion: &Criterion, wildcards: bool, metadata: &dyn MetadataProvider) -> bool {
	if criterion.is_negated()
		|| !criterion.junctors.is_empty()
		|| criterion.comparator.is_some()
		|| criterion.template().is_some()
		|| criterion.field_type.is_some()
		|| criterion.field.is_empty()
	{
		return false;
	}
	if metadata
		.metadata()
		.is_collection_valued_association(&criterion.field)
	{
		return false;
	}
	match &criterion.value {
		Value::Array(items) if items.is_empty() => false,
		Value::Array(items) => !(wildcards && items.iter().any(has_wildcards)),
		value => !(wildcards && has_wildcards(value)),
	}
}

fn has_wildcards(value: &Value) -> bool {
	value.as_str().is_some_and(contains_wildcards)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::criteria::{Criteria, SelectableCriteria};
	use rstest::rstest;
	use symfind_core::{EntityDescriptor, EntityMetadata, OrderBy};

	struct Root(EntityDescriptor);

	impl MetadataProvider for Root {
		fn metadata(&self) -> &dyn EntityMetadata {
			&self.0
		}

		fn metadata_for(&self, _entity: &str) -> Option<&dyn EntityMetadata> {
			Some(&self.0)
		}
	}

	fn filter_for(criteria: Criteria, order_by: OrderBy) -> Option<EqualityFilter> {
		let root = Root(EntityDescriptor::new("Musician", "musicians"));
		let parts = QueryParts::prepare(criteria, &order_by, &root).unwrap();
		equality_filter(&parts, &root)
	}

	#[rstest]
	fn test_plain_equalities_qualify() {
		let criteria = Criteria::new()
			.term("city", "Berlin")
			.term("deleted", Value::Null)
			.term("id", vec![1, 2]);

		let filter = filter_for(criteria, OrderBy::new().desc("name")).unwrap();

		assert_eq!(filter.terms().len(), 3);
		assert_eq!(filter.terms()[2], ("id".to_string(), Value::from(vec![1, 2])));
	}

	#[rstest]
	#[case(Criteria::new().term("band.name", "x"))]
	#[case(Criteria::new().term("!city", "x"))]
	#[case(Criteria::new().term("(|city", "x"))]
	#[case(Criteria::new().term(">age", 3))]
	#[case(Criteria::new().term("name#LOWER(%s)", "x"))]
	#[case(Criteria::new().term("age:integer", "3"))]
	#[case(Criteria::new().term("age@MAX(%s)", 3))]
	#[case(Criteria::new().term("id", Value::Array(vec![])))]
	#[case(Criteria::like().term("name", "M%"))]
	#[case(Criteria::new().selectable(SelectableCriteria::new()))]
	fn test_advanced_features_take_the_general_path(#[case] criteria: Criteria) {
		assert_eq!(filter_for(criteria, OrderBy::new()), None);
	}

	#[rstest]
	fn test_index_ordering_takes_the_general_path() {
		assert_eq!(filter_for(Criteria::new().term("city", "x"), OrderBy::new().index("id")), None);
	}

	#[rstest]
	fn test_wildcards_only_matter_when_enabled() {
		assert!(filter_for(Criteria::new().term("name", "M%"), OrderBy::new()).is_some());
	}
}
