//! Ordering specifications

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CriteriaError;

/// Ordering direction
///
/// `Index` is a pseudo-direction: instead of sorting, the result set is
/// indexed by the named column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Direction {
	Asc,
	Desc,
	Index,
}

impl FromStr for Direction {
	type Err = CriteriaError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_ascii_uppercase().as_str() {
			"ASC" => Ok(Direction::Asc),
			"DESC" => Ok(Direction::Desc),
			"INDEX" => Ok(Direction::Index),
			_ => Err(CriteriaError::InvalidDirection {
				key: String::new(),
				direction: s.to_string(),
			}),
		}
	}
}

impl TryFrom<String> for Direction {
	type Error = CriteriaError;

	fn try_from(s: String) -> Result<Self, Self::Error> {
		s.parse()
	}
}

impl From<Direction> for String {
	fn from(direction: Direction) -> Self {
		direction.to_string()
	}
}

impl fmt::Display for Direction {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			Direction::Asc => "ASC",
			Direction::Desc => "DESC",
			Direction::Index => "INDEX",
		})
	}
}

/// Ordered list of `(field, direction)` pairs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBy {
	entries: Vec<(String, Direction)>,
}

impl OrderBy {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn push(mut self, field: impl Into<String>, direction: Direction) -> Self {
		self.entries.push((field.into(), direction));
		self
	}

	pub fn asc(self, field: impl Into<String>) -> Self {
		self.push(field, Direction::Asc)
	}

	pub fn desc(self, field: impl Into<String>) -> Self {
		self.push(field, Direction::Desc)
	}

	/// Index the result set by `field` instead of sorting
	pub fn index(self, field: impl Into<String>) -> Self {
		self.push(field, Direction::Index)
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, Direction)> {
		self.entries.iter().map(|(field, direction)| (field.as_str(), *direction))
	}

	/// Parse `{"field": "ASC" | "DESC" | "INDEX", ...}`, direction names are case-insensitive
	pub fn from_json(json: serde_json::Value) -> Result<Self, CriteriaError> {
		match json {
			serde_json::Value::Null => Ok(Self::new()),
			serde_json::Value::Object(map) => {
				let mut order_by = Self::new();
				for (key, direction) in map {
					let direction = match &direction {
						serde_json::Value::String(s) => s.parse::<Direction>().map_err(|_| {
							CriteriaError::InvalidDirection {
								key: key.clone(),
								direction: s.clone(),
							}
						})?,
						other => {
							return Err(CriteriaError::InvalidDirection {
								key,
								direction: other.to_string(),
							});
						}
					};
					order_by = order_by.push(key, direction);
				}
				Ok(order_by)
			}
			other => Err(CriteriaError::Decode(format!(
				"ordering must be an object, got {}",
				other
			))),
		}
	}
}

impl<K: Into<String>> FromIterator<(K, Direction)> for OrderBy {
	fn from_iter<T: IntoIterator<Item = (K, Direction)>>(iter: T) -> Self {
		Self {
			entries: iter.into_iter().map(|(k, d)| (k.into(), d)).collect(),
		}
	}
}
