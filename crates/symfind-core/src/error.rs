//! Criteria errors
//!
//! Every variant describes a mistake in the criteria handed to a repository.
//! These are raised while compiling, before any backend interaction, and are
//! never retried.

/// Error raised while parsing or compiling criteria
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum CriteriaError {
	#[error("Comparison for key \"{key}\" already set to \"{existing}\"")]
	DuplicateComparator { key: String, existing: String },

	#[error("Comparison of \"{key}\" with null is undefined, only equality is allowed")]
	NullComparison { key: String },

	#[error("Array-valued comparisons are not allowed (key \"{key}\")")]
	ArrayComparison { key: String },

	#[error("Unterminated operators \"{operators}\" in key \"{key}\"")]
	UnterminatedOperators { key: String, operators: String },

	#[error("Group closed by \"{key}\" was never opened")]
	UnbalancedGroup { key: String },

	#[error("Unsupported value for key \"{key}\": {reason}")]
	UnsupportedValue { key: String, reason: String },

	#[error("Invalid ordering direction \"{direction}\" for \"{key}\"")]
	InvalidDirection { key: String, direction: String },

	#[error("Query options must be the first criteria entry")]
	MisplacedOptions,

	#[error("Decode error: {0}")]
	Decode(String),

	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),
}

impl CriteriaError {
	/// Attach the offending key to a value error raised without one
	pub fn with_key(self, key: &str) -> Self {
		match self {
			CriteriaError::UnsupportedValue { key: k, reason } if k.is_empty() => {
				CriteriaError::UnsupportedValue {
					key: key.to_string(),
					reason,
				}
			}
			other => other,
		}
	}
}

pub type Result<T> = std::result::Result<T, CriteriaError>;
