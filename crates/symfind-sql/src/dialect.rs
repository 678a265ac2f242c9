//! SQL dialects

use sea_query::{
	BinOper, MysqlQueryBuilder, PostgresQueryBuilder, SelectStatement, SqliteQueryBuilder, Values,
};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
	#[default]
	Sqlite,
	Postgres,
	Mysql,
}

impl Dialect {
	/// Quote a single identifier
	pub fn quote(&self, ident: &str) -> String {
		match self {
			Dialect::Mysql => format!("`{}`", ident.replace('`', "``")),
			Dialect::Sqlite | Dialect::Postgres => format!("\"{}\"", ident.replace('"', "\"\"")),
		}
	}

	/// `"alias"."column"` in this dialect's quoting
	pub fn qualify(&self, alias: &str, column: &str) -> String {
		format!("{}.{}", self.quote(alias), self.quote(column))
	}

	pub fn regexp_operator(&self) -> BinOper {
		match self {
			Dialect::Postgres => BinOper::Custom("~"),
			Dialect::Sqlite | Dialect::Mysql => BinOper::Custom("REGEXP"),
		}
	}

	/// Whether the regular expression operator yields a boolean rather than `0`/`1`
	pub fn regexp_is_boolean(&self) -> bool {
		matches!(self, Dialect::Postgres)
	}

	/// SQLite and MySQL reject OFFSET without LIMIT
	pub fn requires_limit_for_offset(&self) -> bool {
		!matches!(self, Dialect::Postgres)
	}

	pub fn build(&self, statement: &SelectStatement) -> (String, Values) {
		match self {
			Dialect::Sqlite => statement.build(SqliteQueryBuilder),
			Dialect::Postgres => statement.build(PostgresQueryBuilder),
			Dialect::Mysql => statement.build(MysqlQueryBuilder),
		}
	}

	pub fn to_sql(&self, statement: &SelectStatement) -> String {
		match self {
			Dialect::Sqlite => statement.to_string(SqliteQueryBuilder),
			Dialect::Postgres => statement.to_string(PostgresQueryBuilder),
			Dialect::Mysql => statement.to_string(MysqlQueryBuilder),
		}
	}
}

impl fmt::Display for Dialect {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Dialect::Sqlite => write!(f, "sqlite"),
			Dialect::Postgres => write!(f, "postgres"),
			Dialect::Mysql => write!(f, "mysql"),
		}
	}
}
