//! Translation of compiled queries into SQL
//!
//! [`SqlRenderer`] turns a [`Query`] into a sea-query [`SelectStatement`].
//! Aliases of the query become table aliases, association joins are resolved
//! from the [`SchemaConfig`], and named parameters are inlined as bound values
//! after coercion to their declared type.

use indexmap::IndexMap;
use sea_query::{
	Alias, Asterisk, Condition as SeaCondition, Expr, ExprTrait, JoinType, LikeExpr, Order,
	Query as SeaQuery, SelectStatement, Value as SeaValue, Values,
};
use symfind_core::{
	Association, Comparator, Condition, Direction, EntityDescriptor, FieldRef, OrderBy, Value,
};
use symfind_orm::compiler::parameter_name;
use symfind_orm::resolver::qualify;
use symfind_orm::{EqualityFilter, Projection, Query, ROOT_ALIAS};
use tracing::debug;

use crate::coerce::{coerce, to_sea_value};
use crate::dialect::Dialect;
use crate::error::{Result, SqlError};
use crate::schema::SchemaConfig;

/// Column carrying the result of a count projection
pub const COUNT_COLUMN: &str = "count";

/// Escape character of LIKE patterns, `\%` and `\_` match literally
const LIKE_ESCAPE: char = '\\';

type Aliases<'s> = IndexMap<String, &'s EntityDescriptor>;

pub struct SqlRenderer<'s> {
	schema: &'s SchemaConfig,
	dialect: Dialect,
}

impl<'s> SqlRenderer<'s> {
	pub fn new(schema: &'s SchemaConfig, dialect: Dialect) -> Self {
		Self { schema, dialect }
	}

	pub fn dialect(&self) -> Dialect {
		self.dialect
	}

	/// Render and build `query` into SQL text and its bound values
	pub fn build(&self, query: &Query) -> Result<(String, Values)> {
		let statement = self.render(query)?;
		Ok(self.dialect.build(&statement))
	}

	/// Render `query` with its values inlined, for logging and inspection
	pub fn to_sql(&self, query: &Query) -> Result<String> {
		let statement = self.render(query)?;
		Ok(self.dialect.to_sql(&statement))
	}

	pub fn render(&self, query: &Query) -> Result<SelectStatement> {
		let root = self.schema.require(query.entity())?;
		let mut statement = SeaQuery::select();
		statement.from_as(Alias::new(&root.table), Alias::new(query.root_alias()));

		let aliases = self.join(&mut statement, query, root)?;
		if let Some(condition) = query.where_condition() {
			statement.cond_where(self.condition(condition, query, &aliases)?);
		}

		match query.projection() {
			Projection::Entity => {
				self.select_entity(&mut statement, query, root);
				self.group_and_filter(&mut statement, query, root, &aliases)?;
				self.order_and_page(&mut statement, query);
				Ok(statement)
			}
			Projection::CountDistinctRoot => self.count(statement, query, root, &aliases),
		}
	}

	fn select_entity(&self, statement: &mut SelectStatement, query: &Query, root: &EntityDescriptor) {
		let alias = query.root_alias();
		if root.columns.is_empty() {
			statement.column((Alias::new(alias), Asterisk));
			return;
		}
		for column in root.columns.keys() {
			statement.column((Alias::new(alias), Alias::new(column)));
		}
		if let Some(index) = query.index_by()
			&& !root.columns.contains_key(index)
		{
			statement.column((Alias::new(alias), Alias::new(index)));
		}
		for join in query.joins() {
			if let Some(index) = &join.index_by {
				debug!(alias = %join.alias, index = %index, "index on joined alias does not affect root rows");
			}
		}
	}

	fn group_and_filter(
		&self,
		statement: &mut SelectStatement,
		query: &Query,
		root: &EntityDescriptor,
		aliases: &Aliases<'_>,
	) -> Result<()> {
		for field in query.group_by() {
			statement.group_by_col((Alias::new(&field.alias), Alias::new(&field.column)));
		}
		if let Some(having) = query.having_condition() {
			// HAVING needs a grouping even without joins
			if query.group_by().is_empty() {
				for identifier in &root.identifier {
					statement.group_by_col((Alias::new(query.root_alias()), Alias::new(identifier)));
				}
			}
			statement.cond_having(self.condition(having, query, aliases)?);
		}
		Ok(())
	}

	fn order_and_page(&self, statement: &mut SelectStatement, query: &Query) {
		for (field, direction) in query.order_by() {
			let order = match direction {
				Direction::Asc => Order::Asc,
				Direction::Desc => Order::Desc,
				Direction::Index => continue,
			};
			statement.order_by_expr(self.field(field), order);
		}
		match (query.max_results(), query.first_result()) {
			(Some(limit), offset) => {
				statement.limit(limit);
				if let Some(offset) = offset {
					statement.offset(offset);
				}
			}
			(None, Some(offset)) => {
				if self.dialect.requires_limit_for_offset() {
					statement.limit(i64::MAX as u64);
				}
				statement.offset(offset);
			}
			(None, None) => {}
		}
	}

	/// `COUNT(DISTINCT root)`, through a grouped subquery for composite identifiers or HAVING
	fn count(
		&self,
		mut statement: SelectStatement,
		query: &Query,
		root: &EntityDescriptor,
		aliases: &Aliases<'_>,
	) -> Result<SelectStatement> {
		let alias = query.root_alias();
		match root.identifier.as_slice() {
			[] => Err(SqlError::MissingIdentifier(root.name.clone())),
			[identifier] if query.having_condition().is_none() => {
				let counted = format!("COUNT(DISTINCT {})", self.dialect.qualify(alias, identifier));
				statement.expr_as(Expr::cust(counted), Alias::new(COUNT_COLUMN));
				Ok(statement)
			}
			identifiers => {
				for identifier in identifiers {
					statement.column((Alias::new(alias), Alias::new(identifier)));
					statement.group_by_col((Alias::new(alias), Alias::new(identifier)));
				}
				if let Some(having) = query.having_condition() {
					statement.cond_having(self.condition(having, query, aliases)?);
				}
				Ok(SeaQuery::select()
					.expr_as(Expr::cust("COUNT(*)"), Alias::new(COUNT_COLUMN))
					.from_subquery(statement, Alias::new("counted"))
					.to_owned())
			}
		}
	}

	/// Add the left joins of `query`, returning the entity behind every alias
	fn join(
		&self,
		statement: &mut SelectStatement,
		query: &Query,
		root: &'s EntityDescriptor,
	) -> Result<Aliases<'s>> {
		let mut aliases = Aliases::new();
		aliases.insert(query.root_alias().to_string(), root);

		for join in query.joins() {
			let parent = *aliases
				.get(&join.parent)
				.ok_or_else(|| SqlError::UnknownAlias(join.parent.clone()))?;
			let (association, target) = self.schema.association(parent, &join.association)?;
			let target_key = primary_key(target)?;
			let alias = Alias::new(&join.alias);

			match association {
				Association::ToOne { column, .. } => {
					statement.join_as(
						JoinType::LeftJoin,
						Alias::new(&target.table),
						alias.clone(),
						Expr::col((alias, Alias::new(target_key)))
							.equals((Alias::new(&join.parent), Alias::new(column))),
					);
				}
				Association::ToMany { mapped_by, .. } => {
					statement.join_as(
						JoinType::LeftJoin,
						Alias::new(&target.table),
						alias.clone(),
						Expr::col((alias, Alias::new(mapped_by)))
							.equals((Alias::new(&join.parent), Alias::new(primary_key(parent)?))),
					);
				}
				Association::ManyToMany {
					join_table,
					source_column,
					target_column,
					..
				} => {
					let link = Alias::new(format!("{}__link", join.alias));
					statement
						.join_as(
							JoinType::LeftJoin,
							Alias::new(join_table),
							link.clone(),
							Expr::col((link.clone(), Alias::new(source_column)))
								.equals((Alias::new(&join.parent), Alias::new(primary_key(parent)?))),
						)
						.join_as(
							JoinType::LeftJoin,
							Alias::new(&target.table),
							alias.clone(),
							Expr::col((alias, Alias::new(target_key)))
								.equals((link, Alias::new(target_column))),
						);
				}
			}
			aliases.insert(join.alias.clone(), target);
		}
		Ok(aliases)
	}

	fn condition(&self, condition: &Condition, query: &Query, aliases: &Aliases<'_>) -> Result<SeaCondition> {
		let leaf = |expr: Expr| SeaCondition::all().add(expr);

		Ok(match condition {
			Condition::And { components } if components.is_empty() => leaf(always(true)),
			Condition::Or { components } if components.is_empty() => leaf(always(false)),
			Condition::And { components } => {
				let mut all = SeaCondition::all();
				for component in components {
					all = all.add(self.condition(component, query, aliases)?);
				}
				all
			}
			Condition::Or { components } => {
				let mut any = SeaCondition::any();
				for component in components {
					any = any.add(self.condition(component, query, aliases)?);
				}
				any
			}
			Condition::Not { inner } => self.condition(inner, query, aliases)?.not(),
			Condition::False => leaf(always(false)),
			Condition::IsNull { field } => leaf(self.field(field).is_null()),
			Condition::Compare { field, op, param } => {
				let value = to_sea_value(&self.parameter(query, param)?);
				let field = self.field(field);
				leaf(match op {
					Comparator::Eq => field.eq(value),
					Comparator::Lt => field.lt(value),
					Comparator::Lte => field.lte(value),
					Comparator::Gt => field.gt(value),
					Comparator::Gte => field.gte(value),
				})
			}
			Condition::In { field, param } => {
				let values: Vec<SeaValue> = match self.parameter(query, param)? {
					Value::Array(items) => items.iter().map(to_sea_value).collect(),
					scalar => vec![to_sea_value(&scalar)],
				};
				if values.is_empty() {
					leaf(always(false))
				} else {
					leaf(self.field(field).is_in(values))
				}
			}
			Condition::Like { field, param } => {
				let pattern = match self.parameter(query, param)? {
					Value::String(pattern) => pattern,
					other => other.index_key(),
				};
				leaf(self.field(field).like(LikeExpr::new(pattern).escape(LIKE_ESCAPE)))
			}
			Condition::RegexpMatch { field, param } => {
				let pattern = to_sea_value(&self.parameter(query, param)?);
				let matched = self
					.field(field)
					.binary(self.dialect.regexp_operator(), Expr::val(pattern));
				if self.dialect.regexp_is_boolean() {
					leaf(matched)
				} else {
					leaf(matched.eq(1))
				}
			}
			Condition::MemberOf { param, collection } => {
				let value = to_sea_value(&self.parameter(query, param)?);
				leaf(self.member_of(value, collection, aliases)?)
			}
		})
	}

	/// `value IN (identifiers related to the owner row)`
	fn member_of(&self, value: SeaValue, collection: &FieldRef, aliases: &Aliases<'_>) -> Result<Expr> {
		let owner = *aliases
			.get(&collection.alias)
			.ok_or_else(|| SqlError::UnknownAlias(collection.alias.clone()))?;
		let owner_key = Alias::new(primary_key(owner)?);
		let owner_alias = Alias::new(&collection.alias);
		let (association, target) = self.schema.association(owner, &collection.column)?;
		let member = Alias::new(format!("{}_{}__member", collection.alias, collection.column));

		let subquery = match association {
			Association::ToOne { column, .. } => {
				return Ok(Expr::col((owner_alias, Alias::new(column))).eq(value));
			}
			Association::ToMany { mapped_by, .. } => SeaQuery::select()
				.column((member.clone(), Alias::new(primary_key(target)?)))
				.from_as(Alias::new(&target.table), member.clone())
				.and_where(
					Expr::col((member, Alias::new(mapped_by))).equals((owner_alias, owner_key)),
				)
				.to_owned(),
			Association::ManyToMany {
				join_table,
				source_column,
				target_column,
				..
			} => SeaQuery::select()
				.column((member.clone(), Alias::new(target_column)))
				.from_as(Alias::new(join_table), member.clone())
				.and_where(
					Expr::col((member, Alias::new(source_column))).equals((owner_alias, owner_key)),
				)
				.to_owned(),
		};
		Ok(Expr::val(value).in_subquery(subquery))
	}

	fn field(&self, field: &FieldRef) -> Expr {
		match &field.template {
			Some(_) => Expr::cust(field.apply_template(&self.dialect.qualify(&field.alias, &field.column))),
			None => Expr::col((Alias::new(&field.alias), Alias::new(&field.column))),
		}
	}

	fn parameter(&self, query: &Query, name: &str) -> Result<Value> {
		let parameter = query
			.parameter(name)
			.ok_or_else(|| SqlError::MissingParameter(name.to_string()))?;
		Ok(coerce(parameter.value.clone(), parameter.declared_type.as_ref()))
	}
}

/// The query a native equality find or count executes
///
/// Terms bind with the declared types of the root entity's columns.
pub fn equality_query(
	root: &EntityDescriptor,
	filter: &EqualityFilter,
	order_by: &OrderBy,
	limit: Option<u64>,
	offset: Option<u64>,
	projection: Projection,
) -> Query {
	let mut query = Query::select(root.name.clone(), ROOT_ALIAS, None);
	query.set_projection(projection);

	let mut terms = Vec::with_capacity(filter.terms().len());
	for (index, (field, value)) in filter.terms().iter().enumerate() {
		let field = qualify(field);
		if value.is_null() {
			terms.push(Condition::is_null(field));
			continue;
		}
		let name = parameter_name(&field, index);
		let declared_type = root.columns.get(&field.column).cloned();
		query.set_parameter(name.clone(), value.clone(), declared_type);
		terms.push(if value.is_array() {
			Condition::is_in(field, name)
		} else {
			Condition::eq(field, name)
		});
	}
	if !terms.is_empty() {
		query.and_where(Condition::and(terms));
	}

	for (key, direction) in order_by.iter() {
		if direction != Direction::Index {
			query.add_order_by(qualify(key), direction);
		}
	}
	query
		.set_max_results(limit.filter(|&n| n > 0))
		.set_first_result(offset.filter(|&n| n > 0));
	query
}

fn primary_key(entity: &EntityDescriptor) -> Result<&str> {
	entity
		.identifier
		.first()
		.map(String::as_str)
		.ok_or_else(|| SqlError::MissingIdentifier(entity.name.clone()))
}

fn always(holds: bool) -> Expr {
	Expr::val(1).eq(if holds { 1 } else { 0 })
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::{fixture, rstest};
	use symfind_core::FieldType;

	#[fixture]
	fn schema() -> SchemaConfig {
		SchemaConfig::new()
			.with_entity(
				EntityDescriptor::new("Musician", "musicians")
					.column("id", FieldType::Integer)
					.column("name", FieldType::String)
					.column("age", FieldType::Integer)
					.association(
						"instruments",
						Association::ManyToMany {
							target: "Instrument".to_string(),
							join_table: "musician_instruments".to_string(),
							source_column: "musician_id".to_string(),
							target_column: "instrument_id".to_string(),
						},
					)
					.association(
						"participations",
						Association::ToMany {
							target: "Participant".to_string(),
							mapped_by: "musician_id".to_string(),
						},
					),
			)
			.with_entity(
				EntityDescriptor::new("Instrument", "instruments")
					.column("id", FieldType::Integer)
					.column("name", FieldType::String),
			)
			.with_entity(
				EntityDescriptor::new("Participant", "project_participants")
					.column("id", FieldType::Integer)
					.column("role", FieldType::String)
					.association(
						"project",
						Association::ToOne {
							target: "Project".to_string(),
							column: "project_id".to_string(),
						},
					),
			)
			.with_entity(
				EntityDescriptor::new("Project", "projects")
					.column("id", FieldType::Integer)
					.column("title", FieldType::String),
			)
	}

	fn join(parent: &str, association: &str, alias: &str) -> symfind_orm::Join {
		symfind_orm::Join {
			parent: parent.to_string(),
			association: association.to_string(),
			alias: alias.to_string(),
			entity: None,
			index_by: None,
		}
	}

	#[rstest]
	fn test_plain_select(schema: SchemaConfig) {
		let mut query = Query::select("Musician", ROOT_ALIAS, None);
		query
			.and_where(Condition::eq(FieldRef::new("main", "name"), "main_name_0"))
			.set_parameter("main_name_0", Value::from("Ada"), Some(FieldType::String));

		let (sql, values) = SqlRenderer::new(&schema, Dialect::Sqlite).build(&query).unwrap();

		assert!(sql.starts_with(r#"SELECT "main"."id", "main"."name", "main"."age" FROM "musicians" AS "main""#));
		assert!(sql.contains(r#""main"."name" = ?"#));
		assert_eq!(values.0, vec![SeaValue::String(Some("Ada".to_string()))]);
	}

	#[rstest]
	fn test_join_chain_and_grouping(schema: SchemaConfig) {
		let mut query = Query::select("Musician", ROOT_ALIAS, None);
		query
			.left_join(join("main", "participations", "participations"))
			.left_join(join("participations", "project", "participations_project"))
			.add_group_by(FieldRef::new("main", "id"))
			.and_where(Condition::eq(
				FieldRef::new("participations_project", "title"),
				"participations_project_title_0",
			))
			.set_parameter("participations_project_title_0", Value::from("Tour"), None);

		let sql = SqlRenderer::new(&schema, Dialect::Postgres).to_sql(&query).unwrap();

		assert!(sql.contains(
			r#"LEFT JOIN "project_participants" AS "participations" ON "participations"."musician_id" = "main"."id""#
		));
		assert!(sql.contains(
			r#"LEFT JOIN "projects" AS "participations_project" ON "participations_project"."id" = "participations"."project_id""#
		));
		assert!(sql.contains(r#"GROUP BY "main"."id""#));
	}

	#[rstest]
	fn test_many_to_many_goes_through_join_table(schema: SchemaConfig) {
		let mut query = Query::select("Musician", ROOT_ALIAS, None);
		query.left_join(join("main", "instruments", "instruments"));

		let sql = SqlRenderer::new(&schema, Dialect::Mysql).to_sql(&query).unwrap();

		assert!(sql.contains("LEFT JOIN `musician_instruments` AS `instruments__link`"));
		assert!(sql.contains("LEFT JOIN `instruments` AS `instruments`"));
	}

	#[rstest]
	fn test_count_distinct_root(schema: SchemaConfig) {
		let mut query = Query::select("Musician", ROOT_ALIAS, None);
		query
			.set_projection(Projection::CountDistinctRoot)
			.left_join(join("main", "instruments", "instruments"));

		let sql = SqlRenderer::new(&schema, Dialect::Sqlite).to_sql(&query).unwrap();

		assert!(sql.starts_with(r#"SELECT COUNT(DISTINCT "main"."id") AS "count""#));
	}

	#[rstest]
	fn test_template_and_regexp(schema: SchemaConfig) {
		let mut query = Query::select("Musician", ROOT_ALIAS, None);
		query
			.and_where(Condition::regexp(
				FieldRef::new("main", "name").with_template("LOWER(%s)"),
				"main_name_0",
			))
			.set_parameter("main_name_0", Value::from("^(ada|bob)$"), None);

		let sqlite = SqlRenderer::new(&schema, Dialect::Sqlite).to_sql(&query).unwrap();
		let postgres = SqlRenderer::new(&schema, Dialect::Postgres).to_sql(&query).unwrap();

		// operand parenthesization differs between sea-query releases
		assert!(sqlite.contains(r#"LOWER("main"."name")"#));
		assert!(sqlite.contains("REGEXP '^(ada|bob)$'"));
		assert!(sqlite.ends_with("= 1"));
		assert!(postgres.contains(r#"LOWER("main"."name")"#));
		assert!(postgres.contains("~ '^(ada|bob)$'"));
		assert!(!postgres.contains("= 1"));
	}

	#[rstest]
	#[case(Dialect::Sqlite)]
	#[case(Dialect::Postgres)]
	#[case(Dialect::Mysql)]
	fn test_like_declares_escape(schema: SchemaConfig, #[case] dialect: Dialect) {
		let mut query = Query::select("Musician", ROOT_ALIAS, None);
		query
			.and_where(Condition::like(FieldRef::new("main", "name"), "main_name_0"))
			.set_parameter("main_name_0", Value::from("A\\_%"), None);

		let (sql, values) = SqlRenderer::new(&schema, dialect).build(&query).unwrap();

		assert!(sql.contains(" LIKE "));
		assert!(sql.contains(" ESCAPE "));
		assert_eq!(values.0, vec![SeaValue::from("A\\_%")]);
	}

	#[rstest]
	fn test_member_of_subquery(schema: SchemaConfig) {
		let mut query = Query::select("Musician", ROOT_ALIAS, None);
		query
			.and_where(Condition::is_member_of("main_instruments_0", FieldRef::new("main", "instruments")))
			.set_parameter("main_instruments_0", Value::Int(3), None);

		let sql = SqlRenderer::new(&schema, Dialect::Sqlite).to_sql(&query).unwrap();

		assert!(sql.contains("3 IN (SELECT"));
		assert!(sql.contains(r#"FROM "musician_instruments" AS "main_instruments__member""#));
	}

	#[rstest]
	fn test_false_and_missing_parameter(schema: SchemaConfig) {
		let mut query = Query::select("Musician", ROOT_ALIAS, None);
		query.and_where(Condition::False);
		let sql = SqlRenderer::new(&schema, Dialect::Sqlite).to_sql(&query).unwrap();
		assert!(sql.contains("WHERE 1 = 0"));

		let mut query = Query::select("Musician", ROOT_ALIAS, None);
		query.and_where(Condition::eq(FieldRef::new("main", "age"), "main_age_0"));
		assert!(matches!(
			SqlRenderer::new(&schema, Dialect::Sqlite).render(&query),
			Err(SqlError::MissingParameter(name)) if name == "main_age_0"
		));
	}

	#[rstest]
	fn test_unknown_association(schema: SchemaConfig) {
		let mut query = Query::select("Musician", ROOT_ALIAS, None);
		query.left_join(join("main", "bands", "bands"));

		assert!(matches!(
			SqlRenderer::new(&schema, Dialect::Sqlite).render(&query),
			Err(SqlError::UnknownAssociation { association, .. }) if association == "bands"
		));
	}

	#[rstest]
	fn test_equality_query_types_and_nulls(schema: SchemaConfig) {
		let mut filter = EqualityFilter::new();
		filter.push("age", Value::from("42"));
		filter.push("name", Value::Null);
		filter.push("id", Value::from(vec![1, 2]));
		let root = schema.require("Musician").unwrap();

		let query = equality_query(root, &filter, &OrderBy::new().desc("age"), Some(10), Some(0), Projection::Entity);
		let (sql, values) = SqlRenderer::new(&schema, Dialect::Sqlite).build(&query).unwrap();

		assert!(sql.contains(r#""main"."name" IS NULL"#));
		assert!(sql.contains(r#""main"."id" IN (?, ?)"#));
		assert!(sql.contains(r#"ORDER BY "main"."age" DESC"#));
		assert_eq!(values.0[0], SeaValue::BigInt(Some(42)));
		assert_eq!(query.first_result(), None);
	}

	#[rstest]
	fn test_offset_without_limit(schema: SchemaConfig) {
		let mut query = Query::select("Musician", ROOT_ALIAS, None);
		query.set_first_result(Some(5));

		let sqlite = SqlRenderer::new(&schema, Dialect::Sqlite).to_sql(&query).unwrap();
		let postgres = SqlRenderer::new(&schema, Dialect::Postgres).to_sql(&query).unwrap();

		assert!(sqlite.contains("LIMIT"));
		assert!(!postgres.contains("LIMIT"));
		assert!(postgres.contains("OFFSET 5"));
	}
}
