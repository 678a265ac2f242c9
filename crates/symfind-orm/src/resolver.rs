//! Association resolution
//!
//! Dotted field paths such as `project.owner.name` imply a chain of joins.
//! Each prefix of the chain becomes one join whose alias is the prefix with
//! dots replaced by underscores (`project`, `project_owner`), so repeated
//! paths share their joins.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use symfind_core::{Direction, FieldRef, OrderBy};

use crate::criterion::Criterion;

/// Alias of the root entity
pub const ROOT_ALIAS: &str = "main";

/// One join of the query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinDescriptor {
	pub parent: String,
	pub association: String,
	pub alias: String,
}

/// Joins, result indexing and ordering derived from criteria and order-by
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resolution {
	pub joins: IndexMap<String, JoinDescriptor>,
	/// Requested result indexing, column per alias
	pub index_by: IndexMap<String, String>,
	pub order_by: Vec<(FieldRef, Direction)>,
}

impl Resolution {
	fn add_path(&mut self, path: &str) {
		let mut parent = ROOT_ALIAS.to_string();
		let mut segments: Vec<&str> = path.split('.').collect();
		segments.pop();
		for depth in 0..segments.len() {
			let alias = segments[..=depth].join("_");
			self.joins.entry(alias.clone()).or_insert_with(|| JoinDescriptor {
				parent: parent.clone(),
				association: segments[depth].to_string(),
				alias: alias.clone(),
			});
			parent = alias;
		}
	}
}

/// Split a dotted path into its alias and column
///
/// ```
/// use symfind_orm::resolver::qualify;
///
/// assert_eq!(qualify("name").qualified(), "main.name");
/// assert_eq!(qualify("project.owner.name").qualified(), "project_owner.name");
/// ```
pub fn qualify(path: &str) -> FieldRef {
	match path.rsplit_once('.') {
		Some((prefix, column)) => FieldRef::new(prefix.replace('.', "_"), column),
		None => FieldRef::new(ROOT_ALIAS, path),
	}
}

/// Collect joins from criteria and orderings, and split off `INDEX` orderings
pub fn resolve<'a, I>(criteria: I, order_by: &OrderBy) -> Resolution
where
	I: IntoIterator<Item = &'a Criterion>,
{
	let mut resolution = Resolution::default();
	for criterion in criteria {
		if criterion.field.contains('.') {
			resolution.add_path(&criterion.field);
		}
	}
	for (key, direction) in order_by.iter() {
		if key.contains('.') {
			resolution.add_path(key);
		}
		let field = qualify(key);
		match direction {
			Direction::Index => {
				resolution.index_by.insert(field.alias, field.column);
			}
			direction => resolution.order_by.push((field, direction)),
		}
	}
	resolution
}
