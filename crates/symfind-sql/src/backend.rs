//! SQLite execution of compiled queries

use async_trait::async_trait;
use indexmap::IndexMap;
use sea_query::{Value as SeaValue, Values};
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use sqlx::sqlite::{SqliteArguments, SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Row as SqlxRow, Sqlite, SqlitePool, TypeInfo, ValueRef};
use std::marker::PhantomData;
use std::str::FromStr;
use std::sync::Arc;
use symfind_core::{EntityDescriptor, EntityMetadata, FieldType, OrderBy};
use symfind_orm::{Backend, EqualityFilter, MetadataProvider, Projection, Query};
use tracing::{debug, warn};

use crate::dialect::Dialect;
use crate::error::{Result, SqlError};
use crate::render::{COUNT_COLUMN, SqlRenderer, equality_query};
use crate::schema::SchemaConfig;
use crate::settings::SqlSettings;

/// A result row, keyed by column name
pub type Record = serde_json::Map<String, JsonValue>;

/// Backend hydrating root entities of type `E` from a SQLite database
///
/// Rows are turned into [`Record`]s and deserialized with serde, so `E` only
/// needs `Deserialize` with field names matching the root entity's columns.
pub struct SqlBackend<E> {
	pool: Arc<SqlitePool>,
	schema: Arc<SchemaConfig>,
	root: EntityDescriptor,
	_entity: PhantomData<fn() -> E>,
}

impl<E> SqlBackend<E> {
	/// Wrap an existing pool
	///
	/// REGEXP criteria need connections opened with
	/// [`SqliteConnectOptions::with_regexp`].
	pub fn new(pool: SqlitePool, schema: impl Into<Arc<SchemaConfig>>, root: &str) -> Result<Self> {
		let schema = schema.into();
		let root = schema.require(root)?.clone();
		Ok(Self {
			pool: Arc::new(pool),
			schema,
			root,
			_entity: PhantomData,
		})
	}

	/// Open a pool from settings, loading the schema file when one is configured
	pub async fn connect(settings: &SqlSettings, root: &str) -> Result<Self> {
		if settings.dialect != Dialect::Sqlite {
			return Err(SqlError::UnsupportedDialect(settings.dialect));
		}
		let schema = match &settings.schema {
			Some(path) => SchemaConfig::from_file(path)?,
			None => SchemaConfig::default(),
		};
		let options = SqliteConnectOptions::from_str(&settings.database_url)?.with_regexp();
		let pool = SqlitePoolOptions::new()
			.max_connections(settings.max_connections)
			.connect_with(options)
			.await?;
		debug!(url = %settings.database_url, root, "connected sql backend");
		Self::new(pool, schema, root)
	}

	pub fn pool(&self) -> &SqlitePool {
		&self.pool
	}

	pub fn schema(&self) -> &SchemaConfig {
		&self.schema
	}

	pub fn renderer(&self) -> SqlRenderer<'_> {
		SqlRenderer::new(&self.schema, Dialect::Sqlite)
	}

	async fn fetch_records(&self, sql: String, values: Values) -> Result<Vec<Record>> {
		debug!(sql = %sql, parameters = values.0.len(), "executing query");
		let mut query = sqlx::query(&sql);
		for value in values.0 {
			query = Self::bind_value(query, value);
		}
		let rows = query.fetch_all(self.pool.as_ref()).await?;
		Ok(rows.iter().map(|row| self.convert_row(row)).collect())
	}

	fn bind_value<'q>(
		query: sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>,
		value: SeaValue,
	) -> sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>> {
		match value {
			SeaValue::Bool(v) => query.bind(v),
			SeaValue::TinyInt(v) => query.bind(v.map(i64::from)),
			SeaValue::SmallInt(v) => query.bind(v.map(i64::from)),
			SeaValue::Int(v) => query.bind(v.map(i64::from)),
			SeaValue::BigInt(v) => query.bind(v),
			SeaValue::TinyUnsigned(v) => query.bind(v.map(i64::from)),
			SeaValue::SmallUnsigned(v) => query.bind(v.map(i64::from)),
			SeaValue::Unsigned(v) => query.bind(v.map(i64::from)),
			SeaValue::BigUnsigned(v) => query.bind(v.map(|v| i64::try_from(v).unwrap_or(i64::MAX))),
			SeaValue::Float(v) => query.bind(v.map(f64::from)),
			SeaValue::Double(v) => query.bind(v),
			SeaValue::String(v) => query.bind(v.map(|s| s.to_string())),
			SeaValue::Char(v) => query.bind(v.map(|c| c.to_string())),
			SeaValue::Bytes(v) => query.bind(v.map(|b| b.to_vec())),
			other => {
				warn!(value = ?other, "unsupported value bound as NULL");
				query.bind(None::<i64>)
			}
		}
	}

	fn convert_row(&self, row: &SqliteRow) -> Record {
		let mut record = Record::new();
		for column in row.columns() {
			let declared = self.root.columns.get(column.name());
			record.insert(
				column.name().to_string(),
				read_column(row, column.ordinal(), declared),
			);
		}
		record
	}
}

/// Read a column with its declared type, falling back to the stored type
fn read_column(row: &SqliteRow, index: usize, declared: Option<&FieldType>) -> JsonValue {
	let read = match declared {
		Some(FieldType::Integer) => row
			.try_get::<Option<i64>, _>(index)
			.map(|v| v.map(JsonValue::from)),
		Some(FieldType::Float) => row
			.try_get::<Option<f64>, _>(index)
			.map(|v| v.map(JsonValue::from)),
		Some(FieldType::Boolean) => row
			.try_get::<Option<bool>, _>(index)
			.map(|v| v.map(JsonValue::Bool)),
		Some(FieldType::String) => row
			.try_get::<Option<String>, _>(index)
			.map(|v| v.map(JsonValue::String)),
		Some(FieldType::Custom(_)) | None => return read_stored(row, index),
	};
	match read {
		Ok(value) => value.unwrap_or(JsonValue::Null),
		Err(e) => {
			warn!(column = index, error = %e, "column does not match its declared type");
			read_stored(row, index)
		}
	}
}

fn read_stored(row: &SqliteRow, index: usize) -> JsonValue {
	let type_name = match row.try_get_raw(index) {
		Ok(raw) if raw.is_null() => return JsonValue::Null,
		Ok(raw) => raw.type_info().name().to_ascii_uppercase(),
		Err(_) => return JsonValue::Null,
	};
	let value = match type_name.as_str() {
		"INTEGER" => row.try_get::<i64, _>(index).map(JsonValue::from),
		"REAL" => row.try_get::<f64, _>(index).map(JsonValue::from),
		"BLOB" => row.try_get::<Vec<u8>, _>(index).map(JsonValue::from),
		_ => row.try_get::<String, _>(index).map(JsonValue::String),
	};
	value.unwrap_or(JsonValue::Null)
}

/// The count column of the single row a count projection returns
fn read_count(records: &[Record]) -> Result<u64> {
	match records.first().and_then(|record| record.get(COUNT_COLUMN)) {
		Some(value) => value
			.as_u64()
			.ok_or_else(|| SqlError::InvalidCount(value.to_string())),
		None => Err(SqlError::InvalidCount("no count column".to_string())),
	}
}

/// Keep one record per index value: the last row wins, the first position is kept
fn collapse(records: Vec<Record>, index: &str) -> Vec<Record> {
	let mut indexed: IndexMap<String, Record> = IndexMap::with_capacity(records.len());
	for record in records {
		let key = match record.get(index) {
			Some(JsonValue::String(s)) => s.clone(),
			Some(JsonValue::Null) | None => String::new(),
			Some(other) => other.to_string(),
		};
		indexed.insert(key, record);
	}
	indexed.into_values().collect()
}

impl<E> MetadataProvider for SqlBackend<E> {
	fn metadata(&self) -> &dyn EntityMetadata {
		&self.root
	}

	fn metadata_for(&self, entity: &str) -> Option<&dyn EntityMetadata> {
		if entity == self.root.name {
			return Some(&self.root);
		}
		self.schema
			.entity(entity)
			.map(|descriptor| descriptor as &dyn EntityMetadata)
	}
}

#[async_trait]
impl<E> Backend for SqlBackend<E>
where
	E: DeserializeOwned + Send + 'static,
{
	type Entity = E;
	type Error = SqlError;

	async fn find_by_equality(
		&self,
		filter: &EqualityFilter,
		order_by: &OrderBy,
		limit: Option<u64>,
		offset: Option<u64>,
	) -> Result<Vec<E>> {
		let query = equality_query(&self.root, filter, order_by, limit, offset, Projection::Entity);
		self.fetch(&query).await
	}

	async fn count_by_equality(&self, filter: &EqualityFilter) -> Result<u64> {
		let query = equality_query(
			&self.root,
			filter,
			&OrderBy::new(),
			None,
			None,
			Projection::CountDistinctRoot,
		);
		self.fetch_count(&query).await
	}

	async fn fetch(&self, query: &Query) -> Result<Vec<E>> {
		let (sql, values) = self.renderer().build(query)?;
		let mut records = self.fetch_records(sql, values).await?;
		if let Some(index) = query.index_by() {
			records = collapse(records, index);
		}
		records
			.into_iter()
			.map(|record| Ok(serde_json::from_value(JsonValue::Object(record))?))
			.collect()
	}

	async fn fetch_count(&self, query: &Query) -> Result<u64> {
		let (sql, values) = self.renderer().build(query)?;
		let records = self.fetch_records(sql, values).await?;
		read_count(&records)
	}
}
