//! Repository errors

use symfind_core::CriteriaError;

/// Error of a repository call
///
/// Criteria errors are raised before the backend is touched; backend errors
/// are passed through as they are.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum FindError<E>
where
	E: std::error::Error + 'static,
{
	#[error(transparent)]
	Criteria(#[from] CriteriaError),

	#[error(transparent)]
	Backend(E),
}

impl<E> FindError<E>
where
	E: std::error::Error + 'static,
{
	pub fn backend(&self) -> Option<&E> {
		match self {
			FindError::Backend(e) => Some(e),
			_ => None,
		}
	}
}

pub type FindResult<T, E> = std::result::Result<T, FindError<E>>;
