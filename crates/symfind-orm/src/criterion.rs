//! Parsed criteria terms
//!
//! A [`Criterion`] is one filter term: a dotted field path, the value to
//! compare against, and the operators that were attached to it. Criteria are
//! produced by the key parser from symbolic keys such as `"(|!>=age"`, or built
//! directly with [`CriterionBuilder`].

use serde::{Deserialize, Serialize};
use symfind_core::{Comparator, FieldType, Value};

/// Unary operator applied to a single leaf expression
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Modifier {
	Not,
}

/// Boolean combinator of a group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Combinator {
	And,
	Or,
}

/// Grouping operator affecting the shape of the expression tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Junctor {
	/// Opens a group; a negated group is wrapped in `NOT(...)` when closed
	Open { combinator: Combinator, negated: bool },
	Close,
}

impl Junctor {
	pub const AND: Junctor = Junctor::Open {
		combinator: Combinator::And,
		negated: false,
	};
	pub const OR: Junctor = Junctor::Open {
		combinator: Combinator::Or,
		negated: false,
	};
	pub const NOT_AND: Junctor = Junctor::Open {
		combinator: Combinator::And,
		negated: true,
	};
	pub const NOT_OR: Junctor = Junctor::Open {
		combinator: Combinator::Or,
		negated: true,
	};
}

/// One filter term
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Criterion {
	/// Dotted path, `field` or `association.association.field`; empty for pure group closers
	pub field: String,
	pub field_type: Option<FieldType>,
	pub value: Value,
	pub modifiers: Vec<Modifier>,
	pub junctors: Vec<Junctor>,
	/// `None` compiles as equality
	pub comparator: Option<Comparator>,
	/// Set once compilation decided that no parameter is bound
	pub literal: bool,
	pub index: usize,
	/// Aggregate template; routes the criterion to HAVING
	pub group_function: Option<String>,
	/// Inline function template for WHERE use
	pub sql_function: Option<String>,
}

impl Criterion {
	pub fn new(field: impl Into<String>, value: impl Into<Value>) -> Self {
		Self {
			field: field.into(),
			field_type: None,
			value: value.into(),
			modifiers: Vec::new(),
			junctors: Vec::new(),
			comparator: None,
			literal: false,
			index: 0,
			group_function: None,
			sql_function: None,
		}
	}

	/// Start building a criterion on `field`
	pub fn field(field: impl Into<String>) -> CriterionBuilder {
		CriterionBuilder::new(field)
	}

	/// A term that only closes the innermost open group
	pub fn close() -> Self {
		let mut criterion = Self::new("", Value::Bool(true));
		criterion.junctors.push(Junctor::Close);
		criterion
	}

	/// Aggregate criteria are evaluated in HAVING, everything else in WHERE
	pub fn is_aggregate(&self) -> bool {
		self.group_function.is_some()
	}

	pub fn is_negated(&self) -> bool {
		!self.modifiers.is_empty()
	}

	pub fn resolved_comparator(&self) -> Comparator {
		self.comparator.unwrap_or(Comparator::Eq)
	}

	/// The function template applied to the field, aggregate templates take precedence
	pub fn template(&self) -> Option<&str> {
		self.group_function
			.as_deref()
			.or(self.sql_function.as_deref())
	}
}

/// Fluent construction of a [`Criterion`]
///
/// ```
/// use symfind_orm::criterion::{Criterion, Junctor};
/// use symfind_core::Comparator;
///
/// let criterion = Criterion::field("age").open(Junctor::OR).not().gte(30);
///
/// assert_eq!(criterion.comparator, Some(Comparator::Gte));
/// assert_eq!(criterion.junctors, vec![Junctor::OR]);
/// assert!(criterion.is_negated());
/// ```
#[derive(Debug, Clone)]
pub struct CriterionBuilder {
	criterion: Criterion,
}

impl CriterionBuilder {
	fn new(field: impl Into<String>) -> Self {
		Self {
			criterion: Criterion::new(field, Value::Null),
		}
	}

	/// Open a group before this term
	pub fn open(mut self, junctor: Junctor) -> Self {
		self.criterion.junctors.push(junctor);
		self
	}

	/// Close the innermost group before this term
	pub fn close_group(mut self) -> Self {
		self.criterion.junctors.push(Junctor::Close);
		self
	}

	pub fn not(mut self) -> Self {
		self.criterion.modifiers.push(Modifier::Not);
		self
	}

	/// Declare the type of the bound parameter
	pub fn cast(mut self, field_type: FieldType) -> Self {
		self.criterion.field_type = Some(field_type);
		self
	}

	/// Wrap the field in an inline function template such as `LOWER(%s)`
	pub fn function(mut self, template: impl Into<String>) -> Self {
		self.criterion.sql_function = Some(template.into());
		self
	}

	/// Wrap the field in an aggregate template such as `COUNT(%s)`
	pub fn having(mut self, template: impl Into<String>) -> Self {
		self.criterion.group_function = Some(template.into());
		self
	}

	/// Finish with implicit equality
	pub fn value(mut self, value: impl Into<Value>) -> Criterion {
		self.criterion.value = value.into();
		self.criterion
	}

	pub fn compare(mut self, comparator: Comparator, value: impl Into<Value>) -> Criterion {
		self.criterion.comparator = Some(comparator);
		self.value(value)
	}

	pub fn eq(self, value: impl Into<Value>) -> Criterion {
		self.compare(Comparator::Eq, value)
	}

	pub fn lt(self, value: impl Into<Value>) -> Criterion {
		self.compare(Comparator::Lt, value)
	}

	pub fn lte(self, value: impl Into<Value>) -> Criterion {
		self.compare(Comparator::Lte, value)
	}

	pub fn gt(self, value: impl Into<Value>) -> Criterion {
		self.compare(Comparator::Gt, value)
	}

	pub fn gte(self, value: impl Into<Value>) -> Criterion {
		self.compare(Comparator::Gte, value)
	}
}
