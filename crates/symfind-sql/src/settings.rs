//! Connection settings

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use symfind_orm::settings::{SettingsError, load_toml};

use crate::dialect::Dialect;

fn default_database_url() -> String {
	"sqlite::memory:".to_string()
}

fn default_max_connections() -> u32 {
	1
}

/// Database settings of a [`SqlBackend`](crate::SqlBackend)
///
/// ```
/// use symfind_sql::{Dialect, SqlSettings};
///
/// let settings = SqlSettings::from_toml_str(
/// 	r#"
/// 	database_url = "sqlite://music.db"
/// 	schema = "schema.toml"
/// 	"#,
/// )
/// .unwrap();
///
/// assert_eq!(settings.dialect, Dialect::Sqlite);
/// assert_eq!(settings.max_connections, 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SqlSettings {
	#[serde(default = "default_database_url")]
	pub database_url: String,

	#[serde(default)]
	pub dialect: Dialect,

	/// In-memory databases exist per connection, keep this at 1 for them
	#[serde(default = "default_max_connections")]
	pub max_connections: u32,

	/// Path of the [`SchemaConfig`](crate::SchemaConfig) TOML file
	#[serde(default)]
	pub schema: Option<PathBuf>,
}

impl Default for SqlSettings {
	fn default() -> Self {
		Self {
			database_url: default_database_url(),
			dialect: Dialect::default(),
			max_connections: default_max_connections(),
			schema: None,
		}
	}
}

impl SqlSettings {
	pub fn from_toml_str(content: &str) -> Result<Self, SettingsError> {
		let settings: SqlSettings = toml::from_str(content)?;
		settings.validated()
	}

	pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
		let settings: SqlSettings = load_toml(path)?;
		settings.validated()
	}

	fn validated(self) -> Result<Self, SettingsError> {
		if self.max_connections == 0 {
			return Err(SettingsError::Invalid(
				"max_connections must be at least 1".to_string(),
			));
		}
		Ok(self)
	}
}
