//! Caller-facing criteria input
//!
//! [`Criteria`] is an ordered list of entries. Order matters: group operators
//! in keys open and close groups relative to their neighbours, the options
//! entry is only honoured in first position, and the same expression may
//! appear more than once.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use symfind_core::{Condition, CriteriaError, Direction, FieldRef, OrderBy, Value};

use crate::criterion::Criterion;

/// Key of the options entry in the JSON form
pub const OPTIONS_KEY: &str = "__OPTIONS__";

/// Per-call options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriteriaOptions {
	/// Interpret unescaped `%` and `_` in string values as wildcards
	#[serde(rename = "LIKE", default)]
	pub wildcards: bool,
}

impl CriteriaOptions {
	pub fn wildcards() -> Self {
		Self { wildcards: true }
	}
}

/// Pre-built filter merged into the query unmodified, after everything else
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectableCriteria {
	pub filter: Option<Condition>,
	pub parameters: IndexMap<String, Value>,
	pub orderings: Vec<(FieldRef, Direction)>,
	pub first_result: Option<u64>,
	pub max_results: Option<u64>,
}

impl SelectableCriteria {
	pub fn new() -> Self {
		Self::default()
	}

	/// AND `condition` into the filter
	pub fn and_where(mut self, condition: Condition) -> Self {
		self.filter = Some(match self.filter.take() {
			Some(existing) => Condition::and(vec![existing, condition]),
			None => condition,
		});
		self
	}

	pub fn parameter(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
		self.parameters.insert(name.into(), value.into());
		self
	}

	pub fn order_by(mut self, field: FieldRef, direction: Direction) -> Self {
		self.orderings.push((field, direction));
		self
	}

	pub fn first_result(mut self, offset: u64) -> Self {
		self.first_result = Some(offset);
		self
	}

	pub fn max_results(mut self, limit: u64) -> Self {
		self.max_results = Some(limit);
		self
	}
}

/// One criteria entry
#[derive(Debug, Clone, PartialEq)]
pub enum CriteriaEntry {
	Options(CriteriaOptions),
	/// Symbolic key such as `"!(|name#LOWER(%s)"` with its value
	Term { key: String, value: Value },
	Criterion(Criterion),
	Selectable(SelectableCriteria),
}

/// Ordered criteria
///
/// ```
/// use symfind_orm::criteria::Criteria;
///
/// let criteria = Criteria::new()
/// 	.term("(|city", "Berlin")
/// 	.term("city", "Hamburg")
/// 	.term(")", true)
/// 	.term("!deleted", Option::<i64>::None);
///
/// assert_eq!(criteria.len(), 4);
/// assert!(!criteria.options().unwrap().wildcards);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Criteria {
	entries: Vec<CriteriaEntry>,
}

impl Criteria {
	pub fn new() -> Self {
		Self::default()
	}

	/// Criteria with wildcard interpretation switched on
	pub fn like() -> Self {
		Self::new().with_options(CriteriaOptions::wildcards())
	}

	pub fn push(mut self, entry: CriteriaEntry) -> Self {
		self.entries.push(entry);
		self
	}

	pub fn term(self, key: impl Into<String>, value: impl Into<Value>) -> Self {
		self.push(CriteriaEntry::Term {
			key: key.into(),
			value: value.into(),
		})
	}

	pub fn criterion(self, criterion: Criterion) -> Self {
		self.push(CriteriaEntry::Criterion(criterion))
	}

	pub fn selectable(self, criteria: SelectableCriteria) -> Self {
		self.push(CriteriaEntry::Selectable(criteria))
	}

	/// Set the options entry, replacing an existing leading one
	pub fn with_options(mut self, options: CriteriaOptions) -> Self {
		match self.entries.first_mut() {
			Some(CriteriaEntry::Options(existing)) => *existing = options,
			_ => self.entries.insert(0, CriteriaEntry::Options(options)),
		}
		self
	}

	pub fn entries(&self) -> &[CriteriaEntry] {
		&self.entries
	}

	pub fn into_entries(self) -> Vec<CriteriaEntry> {
		self.entries
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// Options of this call; only a leading options entry counts
	pub fn options(&self) -> Result<CriteriaOptions, CriteriaError> {
		let mut options = CriteriaOptions::default();
		for (position, entry) in self.entries.iter().enumerate() {
			if let CriteriaEntry::Options(found) = entry {
				if position > 0 {
					return Err(CriteriaError::MisplacedOptions);
				}
				options = *found;
			}
		}
		Ok(options)
	}

	/// Build criteria from JSON
	///
	/// Objects keep their key order. Numeric keys, and every element of an
	/// array, hold a one-entry object `{expression: value}`; this is how the
	/// same expression is repeated. The options object is only recognised
	/// under the first key.
	pub fn from_json(json: serde_json::Value) -> Result<Self, CriteriaError> {
		let pairs: Vec<(Option<String>, serde_json::Value)> = match json {
			serde_json::Value::Null => Vec::new(),
			serde_json::Value::Object(map) => map.into_iter().map(|(k, v)| (Some(k), v)).collect(),
			serde_json::Value::Array(items) => items.into_iter().map(|v| (None, v)).collect(),
			other => {
				return Err(CriteriaError::Decode(format!(
					"criteria must be an object or an array, got {}",
					other
				)));
			}
		};

		let mut criteria = Self::new();
		for (position, (key, value)) in pairs.into_iter().enumerate() {
			let (key, value) = match key {
				Some(key) if !key.is_empty() && key.bytes().all(|b| b.is_ascii_digit()) => unwrap_pair(value)?,
				Some(key) => (key, value),
				None => unwrap_pair(value)?,
			};
			if key == OPTIONS_KEY {
				if position > 0 {
					return Err(CriteriaError::MisplacedOptions);
				}
				let options: CriteriaOptions = serde_json::from_value(value)?;
				criteria = criteria.push(CriteriaEntry::Options(options));
				continue;
			}
			let value = Value::try_from(value).map_err(|e| e.with_key(&key))?;
			criteria = criteria.term(key, value);
		}
		Ok(criteria)
	}
}

fn unwrap_pair(value: serde_json::Value) -> Result<(String, serde_json::Value), CriteriaError> {
	match value {
		serde_json::Value::Object(map) if map.len() == 1 => {
			map.into_iter()
				.next()
				.ok_or_else(|| CriteriaError::Decode("empty criteria pair".to_string()))
		}
		other => Err(CriteriaError::Decode(format!(
			"expected a one-entry object, got {}",
			other
		))),
	}
}

/// A listing request in its transport encoding
///
/// Criteria and sorting arrive as base64-encoded JSON documents.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchRequest {
	pub criteria: Criteria,
	pub order_by: OrderBy,
	pub limit: Option<u64>,
	pub offset: Option<u64>,
}

impl SearchRequest {
	pub fn decode(
		find_by: &str,
		sort_by: Option<&str>,
		limit: Option<u64>,
		offset: Option<u64>,
	) -> Result<Self, CriteriaError> {
		let criteria = Criteria::from_json(decode_json(find_by)?)?;
		let order_by = match sort_by {
			Some(encoded) if !encoded.is_empty() => OrderBy::from_json(decode_json(encoded)?)?,
			_ => OrderBy::new(),
		};
		Ok(Self {
			criteria,
			order_by,
			limit,
			offset,
		})
	}
}

fn decode_json(encoded: &str) -> Result<serde_json::Value, CriteriaError> {
	let bytes = STANDARD
		.decode(encoded.trim())
		.map_err(|e| CriteriaError::Decode(e.to_string()))?;
	Ok(serde_json::from_slice(&bytes)?)
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use serde_json::json;

	fn keys(criteria: &Criteria) -> Vec<String> {
		criteria
			.entries()
			.iter()
			.map(|entry| match entry {
				CriteriaEntry::Options(_) => OPTIONS_KEY.to_string(),
				CriteriaEntry::Term { key, .. } => key.clone(),
				CriteriaEntry::Criterion(c) => c.field.clone(),
				CriteriaEntry::Selectable(_) => "<selectable>".to_string(),
			})
			.collect()
	}

	#[rstest]
	fn test_from_json_unwraps_numeric_keys() {
		let criteria = Criteria::from_json(json!({
			"__OPTIONS__": {"LIKE": true},
			"(|name": "A%",
			"0": {"name": "B%"},
			"1": {"name": "C%"},
			")": true,
		}))
		.unwrap();

		assert_eq!(keys(&criteria), vec![OPTIONS_KEY, "(|name", "name", "name", ")"]);
		assert!(criteria.options().unwrap().wildcards);
	}

	#[rstest]
	fn test_from_json_array_of_pairs() {
		let criteria = Criteria::from_json(json!([{"age": 3}, {"!age": 4}])).unwrap();

		assert_eq!(
			criteria.entries()[1],
			CriteriaEntry::Term {
				key: "!age".to_string(),
				value: Value::Int(4)
			}
		);
	}

	#[rstest]
	fn test_misplaced_options_are_rejected() {
		let result = Criteria::from_json(json!({"name": "x", "__OPTIONS__": {"LIKE": true}}));

		assert!(matches!(result, Err(CriteriaError::MisplacedOptions)));
	}

	#[rstest]
	fn test_with_options_replaces_leading_entry() {
		let criteria = Criteria::new()
			.with_options(CriteriaOptions::default())
			.term("a", 1)
			.with_options(CriteriaOptions::wildcards());

		assert_eq!(criteria.len(), 2);
		assert!(criteria.options().unwrap().wildcards);
	}

	#[rstest]
	fn test_object_values_report_their_key() {
		let result = Criteria::from_json(json!({"name": {"nested": 1}}));

		assert!(matches!(
			result,
			Err(CriteriaError::UnsupportedValue { ref key, .. }) if key == "name"
		));
	}

	#[rstest]
	fn test_search_request_decode() {
		let find_by = STANDARD.encode(r#"{"city": "Berlin", ">=age": 30}"#);
		let sort_by = STANDARD.encode(r#"{"name": "desc"}"#);

		let request = SearchRequest::decode(&find_by, Some(&sort_by), Some(10), None).unwrap();

		assert_eq!(keys(&request.criteria), vec!["city", ">=age"]);
		assert_eq!(request.order_by, OrderBy::new().desc("name"));
		assert_eq!(request.limit, Some(10));
	}

	#[rstest]
	fn test_search_request_rejects_garbage() {
		let result = SearchRequest::decode("not base64!", None, None, None);

		assert!(matches!(result, Err(CriteriaError::Decode(_))));
	}
}
