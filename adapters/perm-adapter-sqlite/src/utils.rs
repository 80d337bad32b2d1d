//! Shared utilities for the SQLite adapter
//!
//! Error mapping helpers and query builders used across all domain modules.

use quire_types::prelude::*;
use quire_types::perm_adapter::StoredRule;
use sqlx::sqlite::SqliteRow;

/// Build an IN clause with parameterized row ids
pub(crate) fn push_in_ids<'a>(
	mut query: sqlx::QueryBuilder<'a, sqlx::Sqlite>,
	values: &'a [i64],
) -> sqlx::QueryBuilder<'a, sqlx::Sqlite> {
	query.push("(");
	for (i, value) in values.iter().enumerate() {
		if i > 0 {
			query.push(", ");
		}
		query.push_bind(*value);
	}
	query.push(")");
	query
}

/// Log database error for debugging
pub(crate) fn inspect(err: &sqlx::Error) {
	warn!("DB: {:#?}", err);
}

/// Translate a sqlx error into ClResult error
pub(crate) fn db_err(err: sqlx::Error) -> Error {
	match err {
		sqlx::Error::RowNotFound => Error::NotFound,
		err => {
			inspect(&err);
			Error::DbError
		}
	}
}

/// Map a single-row query result, translating SQL errors to ClResult
pub(crate) fn map_res<T, F>(row: Result<SqliteRow, sqlx::Error>, f: F) -> ClResult<T>
where
	F: FnOnce(SqliteRow) -> Result<T, sqlx::Error>,
{
	match row {
		Ok(row) => f(row).inspect_err(inspect).map_err(|_| Error::DbError),
		Err(err) => Err(db_err(err)),
	}
}

/// Collect an iterator of query results, translating errors
pub(crate) fn collect_res<T>(
	iter: impl Iterator<Item = Result<T, sqlx::Error>>,
) -> ClResult<Vec<T>> {
	let mut items = Vec::new();
	for item in iter {
		items.push(item.inspect_err(inspect).map_err(|_| Error::DbError)?);
	}
	Ok(items)
}

pub(crate) fn opt_str(value: Option<String>) -> Option<Box<str>> {
	value.map(Into::into)
}

/// Decode the JSON rule column
pub(crate) fn parse_rule(rule: &str) -> Result<StoredRule, sqlx::Error> {
	serde_json::from_str(rule).map_err(|err| sqlx::Error::Decode(Box::new(err)))
}

pub(crate) fn serialize_rule(rule: &StoredRule) -> ClResult<String> {
	serde_json::to_string(rule).map_err(|err| Error::Internal(format!("rule encoding: {}", err)))
}

// vim: ts=4
