//! Boolean condition algebra
//!
//! Compiled criteria are expressed as a [`Condition`] tree whose leaves refer
//! to alias-qualified fields and named parameters. Backends translate the tree
//! into their own query language; the [`Display`](std::fmt::Display)
//! implementation renders a backend-neutral text form used in logs and tests.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Binary comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Comparator {
	Eq,
	Lt,
	Lte,
	Gt,
	Gte,
}

impl Comparator {
	pub fn name(&self) -> &'static str {
		match self {
			Comparator::Eq => "eq",
			Comparator::Lt => "lt",
			Comparator::Lte => "lte",
			Comparator::Gt => "gt",
			Comparator::Gte => "gte",
		}
	}

	pub fn symbol(&self) -> &'static str {
		match self {
			Comparator::Eq => "=",
			Comparator::Lt => "<",
			Comparator::Lte => "<=",
			Comparator::Gt => ">",
			Comparator::Gte => ">=",
		}
	}
}

impl fmt::Display for Comparator {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.name())
	}
}

/// Reference to a column of an aliased entity, optionally wrapped in a function template
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldRef {
	pub alias: String,
	pub column: String,
	/// `%s`-style template, the first `%s` is replaced by the qualified column
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub template: Option<String>,
}

impl FieldRef {
	pub fn new(alias: impl Into<String>, column: impl Into<String>) -> Self {
		Self {
			alias: alias.into(),
			column: column.into(),
			template: None,
		}
	}

	pub fn with_template(mut self, template: impl Into<String>) -> Self {
		self.template = Some(template.into());
		self
	}

	/// `alias.column`
	pub fn qualified(&self) -> String {
		format!("{}.{}", self.alias, self.column)
	}

	/// Apply the template, if any, to an already rendered column expression
	pub fn apply_template(&self, column: &str) -> String {
		match &self.template {
			Some(template) => template.replacen("%s", column, 1),
			None => column.to_string(),
		}
	}
}

impl fmt::Display for FieldRef {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.apply_template(&self.qualified()))
	}
}

/// Boolean expression over fields and named parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Condition {
	Compare {
		field: FieldRef,
		op: Comparator,
		param: String,
	},
	IsNull {
		field: FieldRef,
	},
	In {
		field: FieldRef,
		param: String,
	},
	Like {
		field: FieldRef,
		param: String,
	},
	/// The bound value is a member of a collection-valued association
	MemberOf {
		param: String,
		collection: FieldRef,
	},
	/// `REGEXP(field, :param) = 1`
	RegexpMatch {
		field: FieldRef,
		param: String,
	},
	/// Always false, compiled from membership in an empty set
	False,
	Not {
		inner: Box<Condition>,
	},
	And {
		components: Vec<Condition>,
	},
	Or {
		components: Vec<Condition>,
	},
}

impl Condition {
	pub fn compare(field: FieldRef, op: Comparator, param: impl Into<String>) -> Self {
		Condition::Compare {
			field,
			op,
			param: param.into(),
		}
	}

	pub fn eq(field: FieldRef, param: impl Into<String>) -> Self {
		Self::compare(field, Comparator::Eq, param)
	}

	pub fn lt(field: FieldRef, param: impl Into<String>) -> Self {
		Self::compare(field, Comparator::Lt, param)
	}

	pub fn lte(field: FieldRef, param: impl Into<String>) -> Self {
		Self::compare(field, Comparator::Lte, param)
	}

	pub fn gt(field: FieldRef, param: impl Into<String>) -> Self {
		Self::compare(field, Comparator::Gt, param)
	}

	pub fn gte(field: FieldRef, param: impl Into<String>) -> Self {
		Self::compare(field, Comparator::Gte, param)
	}

	pub fn is_null(field: FieldRef) -> Self {
		Condition::IsNull { field }
	}

	pub fn is_in(field: FieldRef, param: impl Into<String>) -> Self {
		Condition::In {
			field,
			param: param.into(),
		}
	}

	pub fn like(field: FieldRef, param: impl Into<String>) -> Self {
		Condition::Like {
			field,
			param: param.into(),
		}
	}

	pub fn is_member_of(param: impl Into<String>, collection: FieldRef) -> Self {
		Condition::MemberOf {
			param: param.into(),
			collection,
		}
	}

	pub fn regexp(field: FieldRef, param: impl Into<String>) -> Self {
		Condition::RegexpMatch {
			field,
			param: param.into(),
		}
	}

	pub fn negate(self) -> Self {
		Condition::Not {
			inner: Box::new(self),
		}
	}

	pub fn and(components: Vec<Condition>) -> Self {
		Condition::And { components }
	}

	pub fn or(components: Vec<Condition>) -> Self {
		Condition::Or { components }
	}

	/// Names of all parameters referenced by this condition, in tree order
	pub fn parameter_names(&self) -> Vec<&str> {
		let mut names = Vec::new();
		self.collect_parameters(&mut names);
		names
	}

	fn collect_parameters<'a>(&'a self, names: &mut Vec<&'a str>) {
		match self {
			Condition::Compare { param, .. }
			| Condition::In { param, .. }
			| Condition::Like { param, .. }
			| Condition::MemberOf { param, .. }
			| Condition::RegexpMatch { param, .. } => names.push(param),
			Condition::IsNull { .. } | Condition::False => {}
			Condition::Not { inner } => inner.collect_parameters(names),
			Condition::And { components } | Condition::Or { components } => {
				for component in components {
					component.collect_parameters(names);
				}
			}
		}
	}

	fn fmt_composite(f: &mut fmt::Formatter<'_>, components: &[Condition], junctor: &str, empty: &str) -> fmt::Result {
		match components {
			[] => f.write_str(empty),
			[single] => write!(f, "{}", single),
			_ => {
				f.write_str("(")?;
				for (i, component) in components.iter().enumerate() {
					if i > 0 {
						write!(f, " {} ", junctor)?;
					}
					write!(f, "{}", component)?;
				}
				f.write_str(")")
			}
		}
	}
}

impl fmt::Display for Condition {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Condition::Compare { field, op, param } => write!(f, "{} {} :{}", field, op.symbol(), param),
			Condition::IsNull { field } => write!(f, "{} IS NULL", field),
			Condition::In { field, param } => write!(f, "{} IN(:{})", field, param),
			Condition::Like { field, param } => write!(f, "{} LIKE :{}", field, param),
			Condition::MemberOf { param, collection } => write!(f, ":{} MEMBER OF {}", param, collection),
			Condition::RegexpMatch { field, param } => write!(f, "REGEXP({}, :{}) = 1", field, param),
			Condition::False => f.write_str("1 = 0"),
			Condition::Not { inner } => write!(f, "NOT({})", inner),
			Condition::And { components } => Self::fmt_composite(f, components, "AND", "1 = 1"),
			Condition::Or { components } => Self::fmt_composite(f, components, "OR", "1 = 0"),
		}
	}
}
