//! Compiled query plan
//!
//! [`Query`] is the backend-neutral result of compiling criteria. Its
//! construction methods mirror what a relational query builder offers (root
//! selection, left joins, projections, grouping, WHERE and HAVING, ordering,
//! paging, named parameters), so backends only have to translate it.

use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;
use symfind_core::{Condition, Direction, FieldRef, FieldType, Value};

use crate::criteria::SelectableCriteria;

/// What the query selects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Projection {
	/// Hydrated root entities
	Entity,
	/// `COUNT(DISTINCT root)`
	CountDistinctRoot,
}

/// A left join from `parent` along `association`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Join {
	pub parent: String,
	pub association: String,
	pub alias: String,
	/// Target entity, when metadata could resolve it
	pub entity: Option<String>,
	pub index_by: Option<String>,
}

/// A named parameter with its optional declared type
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Parameter {
	pub value: Value,
	pub declared_type: Option<FieldType>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Query {
	entity: String,
	root_alias: String,
	index_by: Option<String>,
	projection: Projection,
	joins: Vec<Join>,
	group_by: Vec<FieldRef>,
	where_condition: Option<Condition>,
	having_condition: Option<Condition>,
	parameters: IndexMap<String, Parameter>,
	order_by: Vec<(FieldRef, Direction)>,
	max_results: Option<u64>,
	first_result: Option<u64>,
}

impl Query {
	/// Select `entity` under `alias`, optionally indexing results by a root column
	pub fn select(entity: impl Into<String>, alias: impl Into<String>, index_by: Option<String>) -> Self {
		Self {
			entity: entity.into(),
			root_alias: alias.into(),
			index_by,
			projection: Projection::Entity,
			joins: Vec::new(),
			group_by: Vec::new(),
			where_condition: None,
			having_condition: None,
			parameters: IndexMap::new(),
			order_by: Vec::new(),
			max_results: None,
			first_result: None,
		}
	}

	pub fn left_join(&mut self, join: Join) -> &mut Self {
		self.joins.push(join);
		self
	}

	pub fn set_projection(&mut self, projection: Projection) -> &mut Self {
		self.projection = projection;
		self
	}

	pub fn add_group_by(&mut self, field: FieldRef) -> &mut Self {
		self.group_by.push(field);
		self
	}

	/// AND `condition` into the WHERE clause
	pub fn and_where(&mut self, condition: Condition) -> &mut Self {
		self.where_condition = Some(conjoin(self.where_condition.take(), condition));
		self
	}

	/// AND `condition` into the HAVING clause
	pub fn and_having(&mut self, condition: Condition) -> &mut Self {
		self.having_condition = Some(conjoin(self.having_condition.take(), condition));
		self
	}

	pub fn add_order_by(&mut self, field: FieldRef, direction: Direction) -> &mut Self {
		self.order_by.push((field, direction));
		self
	}

	pub fn set_max_results(&mut self, max_results: Option<u64>) -> &mut Self {
		self.max_results = max_results;
		self
	}

	pub fn set_first_result(&mut self, first_result: Option<u64>) -> &mut Self {
		self.first_result = first_result;
		self
	}

	pub fn set_parameter(
		&mut self,
		name: impl Into<String>,
		value: Value,
		declared_type: Option<FieldType>,
	) -> &mut Self {
		self.parameters.insert(name.into(), Parameter { value, declared_type });
		self
	}

	/// Merge pre-built criteria: filter, parameters, orderings and paging
	pub fn add_criteria(&mut self, criteria: &SelectableCriteria) -> &mut Self {
		if let Some(filter) = &criteria.filter {
			self.and_where(filter.clone());
		}
		for (name, value) in &criteria.parameters {
			self.set_parameter(name.clone(), value.clone(), None);
		}
		for (field, direction) in &criteria.orderings {
			self.add_order_by(field.clone(), *direction);
		}
		if criteria.first_result.is_some() {
			self.first_result = criteria.first_result;
		}
		if criteria.max_results.is_some() {
			self.max_results = criteria.max_results;
		}
		self
	}

	pub fn entity(&self) -> &str {
		&self.entity
	}

	pub fn root_alias(&self) -> &str {
		&self.root_alias
	}

	pub fn index_by(&self) -> Option<&str> {
		self.index_by.as_deref()
	}

	pub fn projection(&self) -> Projection {
		self.projection
	}

	pub fn joins(&self) -> &[Join] {
		&self.joins
	}

	pub fn group_by(&self) -> &[FieldRef] {
		&self.group_by
	}

	pub fn where_condition(&self) -> Option<&Condition> {
		self.where_condition.as_ref()
	}

	pub fn having_condition(&self) -> Option<&Condition> {
		self.having_condition.as_ref()
	}

	pub fn parameters(&self) -> &IndexMap<String, Parameter> {
		&self.parameters
	}

	pub fn parameter(&self, name: &str) -> Option<&Parameter> {
		self.parameters.get(name)
	}

	pub fn order_by(&self) -> &[(FieldRef, Direction)] {
		&self.order_by
	}

	pub fn max_results(&self) -> Option<u64> {
		self.max_results
	}

	pub fn first_result(&self) -> Option<u64> {
		self.first_result
	}
}

fn conjoin(existing: Option<Condition>, condition: Condition) -> Condition {
	match existing {
		Some(Condition::And { mut components }) => {
			components.push(condition);
			Condition::and(components)
		}
		Some(existing) => Condition::and(vec![existing, condition]),
		None => condition,
	}
}

impl fmt::Display for Query {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self.projection {
			Projection::Entity => write!(f, "SELECT {}", self.root_alias)?,
			Projection::CountDistinctRoot => write!(f, "SELECT COUNT(DISTINCT {})", self.root_alias)?,
		}
		write!(f, " FROM {} {}", self.entity, self.root_alias)?;
		if let Some(index_by) = &self.index_by {
			write!(f, " INDEX BY {}.{}", self.root_alias, index_by)?;
		}
		for join in &self.joins {
			write!(f, " LEFT JOIN {}.{} {}", join.parent, join.association, join.alias)?;
			if let Some(index_by) = &join.index_by {
				write!(f, " INDEX BY {}.{}", join.alias, index_by)?;
			}
		}
		if let Some(condition) = &self.where_condition {
			write!(f, " WHERE {}", condition)?;
		}
		if !self.group_by.is_empty() {
			let fields: Vec<String> = self.group_by.iter().map(ToString::to_string).collect();
			write!(f, " GROUP BY {}", fields.join(", "))?;
		}
		if let Some(condition) = &self.having_condition {
			write!(f, " HAVING {}", condition)?;
		}
		if !self.order_by.is_empty() {
			let orderings: Vec<String> = self
				.order_by
				.iter()
				.map(|(field, direction)| format!("{} {}", field, direction))
				.collect();
			write!(f, " ORDER BY {}", orderings.join(", "))?;
		}
		Ok(())
	}
}
