//! SQL backend errors

use symfind_orm::SettingsError;

use crate::dialect::Dialect;

#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum SqlError {
	#[error("Database error: {0}")]
	Sqlx(#[from] sqlx::Error),

	#[error("Unknown entity: {0}")]
	UnknownEntity(String),

	#[error("Unknown association '{association}' on entity '{entity}'")]
	UnknownAssociation { entity: String, association: String },

	#[error("Unknown join alias: {0}")]
	UnknownAlias(String),

	#[error("Missing query parameter: {0}")]
	MissingParameter(String),

	#[error("Entity '{0}' has no identifier")]
	MissingIdentifier(String),

	#[error("Dialect {0} cannot be executed by this backend")]
	UnsupportedDialect(Dialect),

	#[error("Count query returned no integer count: {0}")]
	InvalidCount(String),

	#[error("Row deserialization failed: {0}")]
	Deserialization(#[from] serde_json::Error),

	#[error("Settings error: {0}")]
	Settings(#[from] SettingsError),
}

pub type Result<T> = std::result::Result<T, SqlError>;
