//! Entity metadata consumed by the criteria compiler
//!
//! The compiler needs very little from a persistence layer: the identifier
//! fields of an entity, the declared type of a field, and which fields are
//! associations (and whether they are collection-valued). [`EntityMetadata`]
//! captures exactly that. [`EntityDescriptor`] is a serde-friendly
//! implementation that backends can load from configuration.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Declared type of a field or bound parameter
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FieldType {
	Integer,
	Float,
	Boolean,
	String,
	/// Backend specific type name, passed through untouched
	Custom(String),
}

impl From<&str> for FieldType {
	fn from(name: &str) -> Self {
		match name.to_ascii_lowercase().as_str() {
			"integer" | "int" | "smallint" | "bigint" => FieldType::Integer,
			"float" | "double" | "decimal" | "real" => FieldType::Float,
			"boolean" | "bool" => FieldType::Boolean,
			"string" | "text" | "varchar" => FieldType::String,
			_ => FieldType::Custom(name.to_string()),
		}
	}
}

impl From<String> for FieldType {
	fn from(name: String) -> Self {
		FieldType::from(name.as_str())
	}
}

impl From<FieldType> for String {
	fn from(field_type: FieldType) -> Self {
		field_type.to_string()
	}
}

impl fmt::Display for FieldType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			FieldType::Integer => write!(f, "integer"),
			FieldType::Float => write!(f, "float"),
			FieldType::Boolean => write!(f, "boolean"),
			FieldType::String => write!(f, "string"),
			FieldType::Custom(name) => write!(f, "{}", name),
		}
	}
}

/// Metadata about one entity
pub trait EntityMetadata: Send + Sync {
	fn entity_name(&self) -> &str;

	/// Identifier field names, in declaration order
	fn identifier(&self) -> &[String];

	/// Declared type of a plain field, `None` for unknown fields and associations
	fn type_of_field(&self, field: &str) -> Option<FieldType>;

	fn has_association(&self, field: &str) -> bool {
		self.association_target(field).is_some()
	}

	fn is_collection_valued_association(&self, field: &str) -> bool;

	/// Entity name on the other side of an association
	fn association_target(&self, field: &str) -> Option<&str>;
}

/// An association between two entities
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Association {
	/// Many-to-one or one-to-one, `column` on the owning table references the target identifier
	ToOne { target: String, column: String },
	/// One-to-many, `mapped_by` on the target table references the owner identifier
	ToMany { target: String, mapped_by: String },
	/// Many-to-many through a join table
	ManyToMany {
		target: String,
		join_table: String,
		source_column: String,
		target_column: String,
	},
}

impl Association {
	pub fn target(&self) -> &str {
		match self {
			Association::ToOne { target, .. }
			| Association::ToMany { target, .. }
			| Association::ManyToMany { target, .. } => target,
		}
	}

	pub fn is_collection_valued(&self) -> bool {
		!matches!(self, Association::ToOne { .. })
	}
}

fn default_identifier() -> Vec<String> {
	vec!["id".to_string()]
}

/// Declarative entity metadata
///
/// # Examples
///
/// ```
/// use symfind_core::metadata::{EntityDescriptor, EntityMetadata, FieldType};
///
/// let musician = EntityDescriptor::new("Musician", "musicians")
/// 	.column("id", FieldType::Integer)
/// 	.column("name", FieldType::String);
///
/// assert_eq!(musician.identifier(), ["id".to_string()]);
/// assert_eq!(musician.type_of_field("name"), Some(FieldType::String));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityDescriptor {
	#[serde(default)]
	pub name: String,
	pub table: String,
	#[serde(default = "default_identifier")]
	pub identifier: Vec<String>,
	#[serde(default)]
	pub columns: IndexMap<String, FieldType>,
	#[serde(default)]
	pub associations: IndexMap<String, Association>,
}

impl EntityDescriptor {
	pub fn new(name: impl Into<String>, table: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			table: table.into(),
			identifier: default_identifier(),
			columns: IndexMap::new(),
			associations: IndexMap::new(),
		}
	}

	pub fn with_identifier<I, S>(mut self, fields: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.identifier = fields.into_iter().map(Into::into).collect();
		self
	}

	pub fn column(mut self, name: impl Into<String>, field_type: FieldType) -> Self {
		self.columns.insert(name.into(), field_type);
		self
	}

	pub fn association(mut self, name: impl Into<String>, association: Association) -> Self {
		self.associations.insert(name.into(), association);
		self
	}

	pub fn get_association(&self, field: &str) -> Option<&Association> {
		self.associations.get(field)
	}
}

impl EntityMetadata for EntityDescriptor {
	fn entity_name(&self) -> &str {
		&self.name
	}

	fn identifier(&self) -> &[String] {
		&self.identifier
	}

	fn type_of_field(&self, field: &str) -> Option<FieldType> {
		self.columns.get(field).cloned()
	}

	fn is_collection_valued_association(&self, field: &str) -> bool {
		self.associations
			.get(field)
			.is_some_and(Association::is_collection_valued)
	}

	fn association_target(&self, field: &str) -> Option<&str> {
		self.associations.get(field).map(Association::target)
	}
}
