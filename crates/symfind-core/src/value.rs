//! Right-hand side values of criteria

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CriteriaError;

/// An enum with a raw scalar backing value.
///
/// Backed enums may be used directly as criteria values; the raw value is
/// what ends up bound to the query.
pub trait BackedEnum {
	fn backing_value(&self) -> Value;
}

/// Criteria value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged, try_from = "serde_json::Value")]
pub enum Value {
	Null,
	Bool(bool),
	Int(i64),
	Float(f64),
	String(String),
	Array(Vec<Value>),
	/// Backed-enum wrapper, replaced by its raw value when a criterion is parsed
	Backed(Box<Value>),
}

impl Value {
	/// Wrap the backing value of an enum
	pub fn backed<E: BackedEnum + ?Sized>(value: &E) -> Self {
		Value::Backed(Box::new(value.backing_value()))
	}

	/// Replace backed-enum wrappers, including array elements, by their raw values
	pub fn into_raw(self) -> Self {
		match self {
			Value::Backed(inner) => inner.into_raw(),
			Value::Array(items) => Value::Array(items.into_iter().map(Value::into_raw).collect()),
			other => other,
		}
	}

	pub fn is_null(&self) -> bool {
		matches!(self, Value::Null)
	}

	pub fn is_array(&self) -> bool {
		matches!(self, Value::Array(_))
	}

	pub fn as_str(&self) -> Option<&str> {
		match self {
			Value::String(s) => Some(s),
			_ => None,
		}
	}

	pub fn as_array(&self) -> Option<&[Value]> {
		match self {
			Value::Array(items) => Some(items),
			_ => None,
		}
	}

	/// Key used when collapsing result rows by an index column
	pub fn index_key(&self) -> String {
		match self {
			Value::Null => String::new(),
			Value::String(s) => s.clone(),
			other => other.to_string(),
		}
	}

	pub fn to_json(&self) -> serde_json::Value {
		match self {
			Value::Null => serde_json::Value::Null,
			Value::Bool(b) => serde_json::Value::Bool(*b),
			Value::Int(i) => serde_json::Value::from(*i),
			Value::Float(f) => serde_json::Number::from_f64(*f)
				.map(serde_json::Value::Number)
				.unwrap_or(serde_json::Value::Null),
			Value::String(s) => serde_json::Value::String(s.clone()),
			Value::Array(items) => serde_json::Value::Array(items.iter().map(Value::to_json).collect()),
			Value::Backed(inner) => inner.to_json(),
		}
	}
}

impl fmt::Display for Value {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Value::Null => write!(f, "NULL"),
			Value::Bool(b) => write!(f, "{}", b),
			Value::Int(i) => write!(f, "{}", i),
			Value::Float(x) => write!(f, "{}", x),
			Value::String(s) => write!(f, "'{}'", s),
			Value::Array(items) => {
				write!(f, "[")?;
				for (i, item) in items.iter().enumerate() {
					if i > 0 {
						write!(f, ", ")?;
					}
					write!(f, "{}", item)?;
				}
				write!(f, "]")
			}
			Value::Backed(inner) => write!(f, "{}", inner),
		}
	}
}

impl TryFrom<serde_json::Value> for Value {
	type Error = CriteriaError;

	fn try_from(json: serde_json::Value) -> Result<Self, Self::Error> {
		Ok(match json {
			serde_json::Value::Null => Value::Null,
			serde_json::Value::Bool(b) => Value::Bool(b),
			serde_json::Value::Number(n) => {
				if let Some(i) = n.as_i64() {
					Value::Int(i)
				} else if let Some(f) = n.as_f64() {
					Value::Float(f)
				} else {
					return Err(CriteriaError::UnsupportedValue {
						key: String::new(),
						reason: format!("number {} is out of range", n),
					});
				}
			}
			serde_json::Value::String(s) => Value::String(s),
			serde_json::Value::Array(items) => Value::Array(
				items
					.into_iter()
					.map(Value::try_from)
					.collect::<Result<Vec<_>, _>>()?,
			),
			serde_json::Value::Object(_) => {
				return Err(CriteriaError::UnsupportedValue {
					key: String::new(),
					reason: "objects cannot be used as criteria values".to_string(),
				});
			}
		})
	}
}

impl From<&str> for Value {
	fn from(s: &str) -> Self {
		Value::String(s.to_string())
	}
}

impl From<String> for Value {
	fn from(s: String) -> Self {
		Value::String(s)
	}
}

impl From<i64> for Value {
	fn from(i: i64) -> Self {
		Value::Int(i)
	}
}

impl From<i32> for Value {
	fn from(i: i32) -> Self {
		Value::Int(i as i64)
	}
}

impl From<u32> for Value {
	fn from(i: u32) -> Self {
		Value::Int(i as i64)
	}
}

impl From<f64> for Value {
	fn from(f: f64) -> Self {
		Value::Float(f)
	}
}

impl From<bool> for Value {
	fn from(b: bool) -> Self {
		Value::Bool(b)
	}
}

impl<T: Into<Value>> From<Vec<T>> for Value {
	fn from(items: Vec<T>) -> Self {
		Value::Array(items.into_iter().map(Into::into).collect())
	}
}

impl<T: Into<Value>> From<Option<T>> for Value {
	fn from(value: Option<T>) -> Self {
		value.map(Into::into).unwrap_or(Value::Null)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	enum Status {
		Active,
		Retired,
	}

	impl BackedEnum for Status {
		fn backing_value(&self) -> Value {
			match self {
				Status::Active => Value::from("active"),
				Status::Retired => Value::from("retired"),
			}
		}
	}

	#[rstest]
	fn test_backed_values_are_unwrapped_recursively() {
		let value = Value::Array(vec![Value::backed(&Status::Active), Value::backed(&Status::Retired)]);

		assert_eq!(value.into_raw(), Value::from(vec!["active", "retired"]));
	}

	#[rstest]
	#[case(serde_json::json!(null), Value::Null)]
	#[case(serde_json::json!(3), Value::Int(3))]
	#[case(serde_json::json!(1.5), Value::Float(1.5))]
	#[case(serde_json::json!("x"), Value::from("x"))]
	#[case(serde_json::json!([1, "a"]), Value::Array(vec![Value::Int(1), Value::from("a")]))]
	fn test_from_json(#[case] json: serde_json::Value, #[case] expected: Value) {
		assert_eq!(Value::try_from(json).unwrap(), expected);
	}

	#[rstest]
	fn test_objects_are_rejected() {
		let result = Value::try_from(serde_json::json!({"a": 1}));

		assert!(matches!(result, Err(CriteriaError::UnsupportedValue { .. })));
	}
}
