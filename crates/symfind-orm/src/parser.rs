//! Key parser
//!
//! Criteria keys carry their operators inline:
//!
//! ```text
//! [operators]field.path[:type][#inline(%s)][@aggregate(%s)]
//! ```
//!
//! The suffix markers are split off first (`@`, then `#`, then `:`), then the
//! leading run of `! = < > & | ( )` is reduced into junctors, modifiers and
//! at most one comparator.

use regex::Regex;
use std::sync::OnceLock;
use symfind_core::{Comparator, CriteriaError, FieldType, Value};
use tracing::trace;

use crate::criteria::{Criteria, CriteriaEntry, CriteriaOptions, SelectableCriteria};
use crate::criterion::{Criterion, Junctor, Modifier};

/// Upper bound on reduction passes over one operator run
const MAX_REDUCTION_PASSES: usize = 100;

const JUNCTORS: [(&str, Junctor); 5] = [
	("(|", Junctor::OR),
	("(&", Junctor::AND),
	("!(|", Junctor::NOT_OR),
	("!(&", Junctor::NOT_AND),
	(")", Junctor::Close),
];

const MODIFIERS: [(&str, Modifier); 1] = [("!", Modifier::Not)];

const COMPARISONS: [(&str, Comparator); 5] = [
	("<=", Comparator::Lte),
	(">=", Comparator::Gte),
	("=", Comparator::Eq),
	("<", Comparator::Lt),
	(">", Comparator::Gt),
];

static OPERATOR_RUN: OnceLock<Regex> = OnceLock::new();

fn operator_run() -> &'static Regex {
	OPERATOR_RUN.get_or_init(|| Regex::new(r"^[!=<>&|()]+").expect("operator run pattern is valid"))
}

/// Criteria split by condition class
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedCriteria {
	pub options: CriteriaOptions,
	pub where_criteria: Vec<Criterion>,
	pub having_criteria: Vec<Criterion>,
	pub selectable: Vec<SelectableCriteria>,
	where_depth: usize,
	having_depth: usize,
}

impl ParsedCriteria {
	pub fn all(&self) -> impl Iterator<Item = &Criterion> {
		self.where_criteria.iter().chain(self.having_criteria.iter())
	}

	fn push(&mut self, criterion: Criterion) {
		trace!(
			field = %criterion.field,
			index = criterion.index,
			aggregate = criterion.is_aggregate(),
			"parsed criterion"
		);
		// a bare closer belongs to the class whose group it closes
		let having = criterion.is_aggregate()
			|| (criterion.field.is_empty() && self.where_depth == 0 && self.having_depth > 0);
		if having {
			self.having_depth = nested_depth(self.having_depth, &criterion);
			self.having_criteria.push(criterion);
		} else {
			self.where_depth = nested_depth(self.where_depth, &criterion);
			self.where_criteria.push(criterion);
		}
	}

	fn next_index(&self) -> usize {
		self.where_criteria.len() + self.having_criteria.len()
	}
}

fn nested_depth(depth: usize, criterion: &Criterion) -> usize {
	criterion.junctors.iter().fold(depth, |depth, junctor| match junctor {
		Junctor::Open { .. } => depth + 1,
		Junctor::Close => depth.saturating_sub(1),
	})
}

/// Parse all entries of `criteria`
pub fn parse_criteria(criteria: Criteria) -> Result<ParsedCriteria, CriteriaError> {
	let mut parsed = ParsedCriteria {
		options: criteria.options()?,
		..Default::default()
	};
	for entry in criteria.into_entries() {
		match entry {
			CriteriaEntry::Options(_) => {}
			CriteriaEntry::Term { key, value } => {
				let criterion = parse_key(&key, value, parsed.next_index())?;
				parsed.push(criterion);
			}
			CriteriaEntry::Criterion(mut criterion) => {
				check_criterion(&criterion)?;
				criterion.index = parsed.next_index();
				criterion.value = criterion.value.into_raw();
				criterion.literal = false;
				parsed.push(criterion);
			}
			CriteriaEntry::Selectable(selectable) => parsed.selectable.push(selectable),
		}
	}
	Ok(parsed)
}

/// Parse one symbolic key and its value
///
/// ```
/// use symfind_orm::parser::parse_key;
/// use symfind_orm::criterion::Junctor;
/// use symfind_core::{Comparator, Value};
///
/// let criterion = parse_key("(|!>=age", Value::Int(30), 0).unwrap();
///
/// assert_eq!(criterion.field, "age");
/// assert_eq!(criterion.junctors, vec![Junctor::OR]);
/// assert_eq!(criterion.comparator, Some(Comparator::Gte));
/// assert!(criterion.is_negated());
/// ```
pub fn parse_key(key: &str, value: Value, index: usize) -> Result<Criterion, CriteriaError> {
	let value = value.into_raw();
	let (rest, group_function) = split_marker(key, '@');
	let (rest, sql_function) = split_marker(rest, '#');
	let (rest, field_type) = split_marker(rest, ':');

	let (operators, field) = match operator_run().find(rest) {
		Some(m) => (m.as_str(), &rest[m.end()..]),
		None => ("", rest),
	};

	let mut criterion = Criterion::new(field, Value::Null);
	criterion.index = index;
	criterion.field_type = field_type.map(FieldType::from);
	criterion.group_function = group_function.map(str::to_string);
	criterion.sql_function = sql_function.map(str::to_string);

	reduce_operators(field, operators, &value, &mut criterion)?;
	criterion.value = value;
	Ok(criterion)
}

fn split_marker(key: &str, marker: char) -> (&str, Option<&str>) {
	match key.split_once(marker) {
		Some((head, tail)) if !tail.is_empty() => (head, Some(tail)),
		Some((head, _)) => (head, None),
		None => (key, None),
	}
}

fn reduce_operators(
	key: &str,
	operators: &str,
	value: &Value,
	criterion: &mut Criterion,
) -> Result<(), CriteriaError> {
	let mut rest = operators.to_string();
	let mut passes = 0;
	'reduce: while !rest.is_empty() {
		passes += 1;
		if passes > MAX_REDUCTION_PASSES {
			return Err(CriteriaError::UnterminatedOperators {
				key: key.to_string(),
				operators: rest,
			});
		}
		while rest.contains("!!") {
			rest = rest.replace("!!", "");
		}
		for (abbr, junctor) in JUNCTORS {
			if let Some(tail) = rest.strip_prefix(abbr) {
				rest = tail.to_string();
				criterion.junctors.push(junctor);
			}
			if rest.is_empty() {
				break 'reduce;
			}
		}
		for (abbr, modifier) in MODIFIERS {
			if let Some(tail) = rest.strip_prefix(abbr) {
				rest = tail.to_string();
				criterion.modifiers.push(modifier);
			}
			if rest.is_empty() {
				break 'reduce;
			}
		}
		for (abbr, comparator) in COMPARISONS {
			if let Some(tail) = rest.strip_prefix(abbr) {
				if let Some(existing) = criterion.comparator {
					return Err(CriteriaError::DuplicateComparator {
						key: key.to_string(),
						existing: existing.name().to_string(),
					});
				}
				check_comparison(key, comparator, value)?;
				rest = tail.to_string();
				criterion.comparator = Some(comparator);
			}
			if rest.is_empty() {
				break 'reduce;
			}
		}
	}
	Ok(())
}

fn check_comparison(key: &str, comparator: Comparator, value: &Value) -> Result<(), CriteriaError> {
	if comparator == Comparator::Eq && value.is_null() {
		return Err(CriteriaError::NullComparison { key: key.to_string() });
	}
	if value.is_array() {
		return Err(CriteriaError::ArrayComparison { key: key.to_string() });
	}
	Ok(())
}

/// Apply the comparison rules of symbolic keys to a pre-built criterion
fn check_criterion(criterion: &Criterion) -> Result<(), CriteriaError> {
	match criterion.comparator {
		Some(comparator) => check_comparison(&criterion.field, comparator, &criterion.value),
		None => Ok(()),
	}
}
