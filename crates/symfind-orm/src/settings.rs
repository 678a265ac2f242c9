//! Repository settings

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),

	#[error("TOML error: {0}")]
	Toml(#[from] toml::de::Error),

	#[error("Invalid setting: {0}")]
	Invalid(String),
}

/// Load a TOML settings file, falling back to defaults when it does not exist
pub fn load_toml<T>(path: impl AsRef<Path>) -> Result<T, SettingsError>
where
	T: DeserializeOwned + Default,
{
	let path = path.as_ref();
	if !path.exists() {
		return Ok(T::default());
	}
	let content = fs::read_to_string(path)?;
	Ok(toml::from_str(&content)?)
}

fn default_fast_path() -> bool {
	true
}

/// Behaviour of a repository
///
/// ```
/// use symfind_orm::settings::RepositorySettings;
///
/// let settings = RepositorySettings::from_toml_str("fast_path = false").unwrap();
///
/// assert!(!settings.fast_path);
/// assert!(RepositorySettings::default().fast_path);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositorySettings {
	/// Delegate plain equality criteria to the backend's native find
	#[serde(default = "default_fast_path")]
	pub fast_path: bool,
}

impl Default for RepositorySettings {
	fn default() -> Self {
		Self {
			fast_path: default_fast_path(),
		}
	}
}

impl RepositorySettings {
	pub fn from_toml_str(content: &str) -> Result<Self, SettingsError> {
		Ok(toml::from_str(content)?)
	}

	pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
		load_toml(path)
	}

	pub fn without_fast_path() -> Self {
		Self { fast_path: false }
	}
}
