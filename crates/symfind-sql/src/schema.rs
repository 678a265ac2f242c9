//! Table mapping of entities
//!
//! A schema is a set of [`EntityDescriptor`]s keyed by entity name, usually
//! loaded from TOML:
//!
//! ```toml
//! [entities.Musician]
//! table = "musicians"
//!
//! [entities.Musician.columns]
//! id = "integer"
//! name = "string"
//!
//! [entities.Musician.associations.instruments]
//! kind = "many_to_many"
//! target = "Instrument"
//! join_table = "musician_instruments"
//! source_column = "musician_id"
//! target_column = "instrument_id"
//! ```

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use symfind_core::{Association, EntityDescriptor};
use symfind_orm::settings::{SettingsError, load_toml};

use crate::error::{Result, SqlError};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaConfig {
	#[serde(default)]
	pub entities: IndexMap<String, EntityDescriptor>,
}

impl SchemaConfig {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn from_toml_str(content: &str) -> std::result::Result<Self, SettingsError> {
		let schema: SchemaConfig = toml::from_str(content)?;
		Ok(schema.normalized())
	}

	pub fn from_file(path: impl AsRef<Path>) -> std::result::Result<Self, SettingsError> {
		let schema: SchemaConfig = load_toml(path)?;
		Ok(schema.normalized())
	}

	/// Add an entity under its descriptor name
	pub fn with_entity(mut self, descriptor: EntityDescriptor) -> Self {
		self.entities.insert(descriptor.name.clone(), descriptor);
		self
	}

	pub fn entity(&self, name: &str) -> Option<&EntityDescriptor> {
		self.entities.get(name)
	}

	pub fn require(&self, name: &str) -> Result<&EntityDescriptor> {
		self.entity(name)
			.ok_or_else(|| SqlError::UnknownEntity(name.to_string()))
	}

	/// Association `field` of `owner` together with its target entity
	pub fn association<'a>(
		&'a self,
		owner: &'a EntityDescriptor,
		field: &str,
	) -> Result<(&'a Association, &'a EntityDescriptor)> {
		let association = owner
			.get_association(field)
			.ok_or_else(|| SqlError::UnknownAssociation {
				entity: owner.name.clone(),
				association: field.to_string(),
			})?;
		Ok((association, self.require(association.target())?))
	}

	// Entity names default to their table key
	fn normalized(mut self) -> Self {
		for (name, descriptor) in self.entities.iter_mut() {
			if descriptor.name.is_empty() {
				descriptor.name = name.clone();
			}
		}
		self
	}
}
