//! Value compiler
//!
//! Decides, for one criterion, which operation the backend has to perform and
//! whether a parameter must be bound for it. Criteria are annotated in place:
//! `literal` is set when nothing is bound, and wildcard arrays have their value
//! replaced by the regular expression that is bound instead.

use indexmap::IndexMap;
use symfind_core::{Comparator, Condition, FieldRef, Value};

use crate::backend::MetadataProvider;
use crate::criterion::{Criterion, Modifier};
use crate::resolver::{ROOT_ALIAS, qualify};

/// Whether `value` contains an unescaped `%` or `_`
pub fn contains_wildcards(value: &str) -> bool {
	['%', '_']
		.iter()
		.any(|c| value.replace(&format!("\\{}", c), "").contains(*c))
}

/// Replace unescaped `%` by `.*` and unescaped `_` by `.?`
pub fn wildcards_to_regexp(value: &str) -> String {
	let mut regexp = String::with_capacity(value.len() + 8);
	let mut previous = None;
	for c in value.chars() {
		match c {
			'%' if previous != Some('\\') => regexp.push_str(".*"),
			'_' if previous != Some('\\') => regexp.push_str(".?"),
			_ => regexp.push(c),
		}
		previous = Some(c);
	}
	regexp
}

/// Deterministic parameter name for a criterion
pub fn parameter_name(field: &FieldRef, index: usize) -> String {
	format!("{}_{}_{}", field.alias, field.column, index).replace('.', "_")
}

fn text_of(value: &Value) -> String {
	match value {
		Value::String(s) => s.clone(),
		Value::Null => String::new(),
		Value::Bool(true) => "1".to_string(),
		Value::Bool(false) => String::new(),
		other => other.to_string(),
	}
}

/// Compiles criteria of one call
pub struct ValueCompiler<'a> {
	wildcards: bool,
	metadata: &'a dyn MetadataProvider,
	alias_entities: &'a IndexMap<String, String>,
}

impl<'a> ValueCompiler<'a> {
	pub fn new(
		wildcards: bool,
		metadata: &'a dyn MetadataProvider,
		alias_entities: &'a IndexMap<String, String>,
	) -> Self {
		Self {
			wildcards,
			metadata,
			alias_entities,
		}
	}

	/// Whether `field` names a collection-valued association of its alias' entity
	pub fn is_collection_valued(&self, field: &FieldRef) -> bool {
		if field.alias == ROOT_ALIAS {
			return self
				.metadata
				.metadata()
				.is_collection_valued_association(&field.column);
		}
		self.alias_entities
			.get(&field.alias)
			.and_then(|entity| self.metadata.metadata_for(entity))
			.is_some_and(|metadata| metadata.is_collection_valued_association(&field.column))
	}

	/// Compile the leaf expression of `criterion`
	pub fn compile(&self, criterion: &mut Criterion) -> Condition {
		let qualified = qualify(&criterion.field);
		let collection_valued = self.is_collection_valued(&qualified);
		let param = parameter_name(&qualified, criterion.index);
		let field = match criterion.template() {
			Some(template) => qualified.with_template(template),
			None => qualified,
		};
		let comparator = criterion.resolved_comparator();

		let mut condition = match &criterion.value {
			Value::Null => {
				criterion.literal = true;
				Condition::is_null(field)
			}
			Value::Array(items) if items.is_empty() => {
				criterion.literal = true;
				Condition::False
			}
			Value::Array(items) => {
				let texts: Vec<String> = items.iter().map(text_of).collect();
				if self.wildcards && texts.iter().any(|t| contains_wildcards(t)) {
					let alternatives: Vec<String> = texts.iter().map(|t| wildcards_to_regexp(t)).collect();
					criterion.value = Value::String(format!("^({})$", alternatives.join("|")));
					Condition::regexp(field, param)
				} else {
					Condition::is_in(field, param)
				}
			}
			Value::String(s) if self.wildcards && contains_wildcards(s) => Condition::like(field, param),
			_ if collection_valued && comparator == Comparator::Eq => Condition::is_member_of(param, field),
			_ => Condition::compare(field, comparator, param),
		};

		for modifier in &criterion.modifiers {
			match modifier {
				Modifier::Not => condition = condition.negate(),
			}
		}
		condition
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::parser::parse_key;
	use rstest::{fixture, rstest};
	use symfind_core::{Association, EntityDescriptor, EntityMetadata, FieldType};

	struct Schema {
		root: EntityDescriptor,
		band: EntityDescriptor,
	}

	impl MetadataProvider for Schema {
		fn metadata(&self) -> &dyn EntityMetadata {
			&self.root
		}

		fn metadata_for(&self, entity: &str) -> Option<&dyn EntityMetadata> {
			match entity {
				"Musician" => Some(&self.root),
				"Band" => Some(&self.band),
				_ => None,
			}
		}
	}

	#[fixture]
	fn schema() -> Schema {
		Schema {
			root: EntityDescriptor::new("Musician", "musicians")
				.column("name", FieldType::String)
				.association(
					"tags",
					Association::ToMany {
						target: "Tag".to_string(),
						mapped_by: "musician_id".to_string(),
					},
				)
				.association(
					"band",
					Association::ToOne {
						target: "Band".to_string(),
						column: "band_id".to_string(),
					},
				),
			band: EntityDescriptor::new("Band", "bands").association(
				"members",
				Association::ToMany {
					target: "Musician".to_string(),
					mapped_by: "band_id".to_string(),
				},
			),
		}
	}

	fn compile(schema: &Schema, wildcards: bool, key: &str, value: Value) -> (Condition, Criterion) {
		let aliases = IndexMap::from([("band".to_string(), "Band".to_string())]);
		let compiler = ValueCompiler::new(wildcards, schema, &aliases);
		let mut criterion = parse_key(key, value, 4).unwrap();
		let condition = compiler.compile(&mut criterion);
		(condition, criterion)
	}

	#[rstest]
	#[case("%ab", true)]
	#[case("a_b", true)]
	#[case("\\%ab", false)]
	#[case("a\\_b\\%", false)]
	#[case("a\\_b%", true)]
	#[case("plain", false)]
	fn test_contains_wildcards(#[case] value: &str, #[case] expected: bool) {
		assert_eq!(contains_wildcards(value), expected);
	}

	#[rstest]
	#[case("fo%", "fo.*")]
	#[case("ba_", "ba.?")]
	#[case("a\\%b%", "a\\%b.*")]
	fn test_wildcards_to_regexp(#[case] value: &str, #[case] expected: &str) {
		assert_eq!(wildcards_to_regexp(value), expected);
	}

	#[rstest]
	fn test_null_is_literal(schema: Schema) {
		let (condition, criterion) = compile(&schema, false, "name", Value::Null);

		assert_eq!(condition.to_string(), "main.name IS NULL");
		assert!(criterion.literal);
	}

	#[rstest]
	fn test_empty_array_is_false(schema: Schema) {
		let (condition, criterion) = compile(&schema, true, "name", Value::Array(vec![]));

		assert_eq!(condition, Condition::False);
		assert!(criterion.literal);
	}

	#[rstest]
	fn test_array_in_list(schema: Schema) {
		let (condition, criterion) = compile(&schema, true, "name", Value::from(vec!["a", "b"]));

		assert_eq!(condition.to_string(), "main.name IN(:main_name_4)");
		assert!(!criterion.literal);
	}

	#[rstest]
	fn test_wildcard_array_becomes_regexp(schema: Schema) {
		let (condition, criterion) = compile(&schema, true, "name", Value::from(vec!["fo%", "ba_"]));

		assert_eq!(condition.to_string(), "REGEXP(main.name, :main_name_4) = 1");
		assert_eq!(criterion.value, Value::from("^(fo.*|ba.?)$"));
	}

	#[rstest]
	#[case(true, "main.name LIKE :main_name_4")]
	#[case(false, "main.name = :main_name_4")]
	fn test_wildcard_string(schema: Schema, #[case] wildcards: bool, #[case] expected: &str) {
		let (condition, _) = compile(&schema, wildcards, "name", Value::from("fo%_"));

		assert_eq!(condition.to_string(), expected);
	}

	#[rstest]
	#[case("tags", Value::Int(3), ":main_tags_4 MEMBER OF main.tags")]
	#[case("tags", Value::from("x"), ":main_tags_4 MEMBER OF main.tags")]
	#[case(">tags", Value::Int(3), "main.tags > :main_tags_4")]
	#[case("band.members", Value::Int(3), ":band_members_4 MEMBER OF band.members")]
	fn test_member_of(schema: Schema, #[case] key: &str, #[case] value: Value, #[case] expected: &str) {
		let (condition, _) = compile(&schema, false, key, value);

		assert_eq!(condition.to_string(), expected);
	}

	#[rstest]
	fn test_templates_and_modifiers(schema: Schema) {
		let (condition, _) = compile(&schema, false, "!<=band.name#LOWER(%s)", Value::from("m"));

		assert_eq!(condition.to_string(), "NOT(LOWER(band.name) <= :band_name_4)");
	}
}
