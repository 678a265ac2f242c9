//! Query assembly

use symfind_core::{CriteriaError, FieldRef, FieldType};
use tracing::debug;

use crate::backend::MetadataProvider;
use crate::compiler::{ValueCompiler, parameter_name};
use crate::criterion::Criterion;
use crate::parts::QueryParts;
use crate::query::{Join, Projection, Query};
use crate::resolver::{ROOT_ALIAS, qualify};
use crate::tree::build_condition;

/// Compile `parts` into a query
///
/// Joins are followed by a GROUP BY over the root identifier so that the
/// entity projection yields each root row once. The count projection selects
/// `COUNT(DISTINCT root)` and needs no grouping. Zero limits and offsets are
/// ignored.
pub fn assemble(
	mut parts: QueryParts,
	projection: Projection,
	limit: Option<u64>,
	offset: Option<u64>,
	metadata: &dyn MetadataProvider,
) -> Result<Query, CriteriaError> {
	let root = metadata.metadata();
	let mut query = Query::select(
		root.entity_name(),
		ROOT_ALIAS,
		parts.index_by.get(ROOT_ALIAS).cloned(),
	);
	query.set_projection(projection);

	for join in &parts.joins {
		query.left_join(Join {
			parent: join.parent.clone(),
			association: join.association.clone(),
			alias: join.alias.clone(),
			entity: parts.alias_entities.get(&join.alias).cloned(),
			index_by: parts.index_by.get(&join.alias).cloned(),
		});
	}
	if !parts.joins.is_empty() && projection == Projection::Entity {
		for identifier in root.identifier() {
			query.add_group_by(FieldRef::new(ROOT_ALIAS, identifier.clone()));
		}
	}

	let compiler = ValueCompiler::new(parts.options.wildcards, metadata, &parts.alias_entities);
	if let Some(condition) = build_condition(&mut parts.where_criteria, |c| compiler.compile(c))? {
		query.and_where(condition);
	}
	if let Some(condition) = build_condition(&mut parts.having_criteria, |c| compiler.compile(c))? {
		query.and_having(condition);
	}

	for criterion in parts.where_criteria.iter().chain(parts.having_criteria.iter()) {
		if criterion.literal || criterion.field.is_empty() {
			continue;
		}
		let field = qualify(&criterion.field);
		let declared_type = declared_type(criterion, &field, metadata);
		query.set_parameter(
			parameter_name(&field, criterion.index),
			criterion.value.clone(),
			declared_type,
		);
	}

	for (field, direction) in &parts.order_by {
		query.add_order_by(field.clone(), *direction);
	}
	query.set_max_results(limit.filter(|&n| n > 0));
	query.set_first_result(offset.filter(|&n| n > 0));

	for selectable in &parts.selectable {
		query.add_criteria(selectable);
	}

	debug!(
		joins = query.joins().len(),
		parameters = query.parameters().len(),
		query = %query,
		"assembled query"
	);
	Ok(query)
}

/// The explicit type override, or for plain root fields with a scalar value the declared field type
fn declared_type(criterion: &Criterion, field: &FieldRef, metadata: &dyn MetadataProvider) -> Option<FieldType> {
	if criterion.field_type.is_some() {
		return criterion.field_type.clone();
	}
	if field.alias != ROOT_ALIAS || criterion.value.is_array() || criterion.template().is_some() {
		return None;
	}
	metadata.metadata().type_of_field(&field.column)
}
