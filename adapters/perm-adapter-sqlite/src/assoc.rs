//! Many-to-many association tables
//!
//! All four association tables share the `(owner_id, target_id)` shape, so a
//! single set of helpers handles them.

use sqlx::{Row, SqliteConnection};

use crate::utils::{collect_res, db_err, push_in_ids};
use quire_types::prelude::*;

pub(crate) struct Assoc {
	table: &'static str,
	owner: &'static str,
	target: &'static str,
}

pub(crate) const ROLE_PERMISSIONS: Assoc =
	Assoc { table: "role_permissions", owner: "role_id", target: "perm_id" };
pub(crate) const MENU_PERMISSIONS: Assoc =
	Assoc { table: "menu_permissions", owner: "menu_id", target: "perm_id" };
pub(crate) const USER_ROLES: Assoc =
	Assoc { table: "user_roles", owner: "user_id", target: "role_id" };
pub(crate) const USER_PERMISSIONS: Assoc =
	Assoc { table: "user_permissions", owner: "user_id", target: "perm_id" };

pub(crate) async fn list(
	conn: &mut SqliteConnection,
	assoc: &Assoc,
	owner_id: i64,
) -> ClResult<Vec<i64>> {
	let sql = format!(
		"SELECT {target} FROM {table} WHERE {owner} = ? ORDER BY {target}",
		target = assoc.target,
		table = assoc.table,
		owner = assoc.owner
	);
	let rows = sqlx::query(&sql).bind(owner_id).fetch_all(&mut *conn).await.map_err(db_err)?;
	collect_res(rows.iter().map(|row| row.try_get::<i64, _>(0)))
}

pub(crate) async fn add(
	conn: &mut SqliteConnection,
	assoc: &Assoc,
	owner_id: i64,
	ids: &[i64],
) -> ClResult<()> {
	if ids.is_empty() {
		return Ok(());
	}
	let mut query = sqlx::QueryBuilder::new(format!(
		"INSERT OR IGNORE INTO {} ({}, {}) ",
		assoc.table, assoc.owner, assoc.target
	));
	query.push_values(ids, |mut row, id| {
		row.push_bind(owner_id).push_bind(*id);
	});
	query.build().execute(&mut *conn).await.map_err(db_err)?;
	Ok(())
}

pub(crate) async fn remove(
	conn: &mut SqliteConnection,
	assoc: &Assoc,
	owner_id: i64,
	ids: &[i64],
) -> ClResult<()> {
	if ids.is_empty() {
		return Ok(());
	}
	let mut query = sqlx::QueryBuilder::new(format!(
		"DELETE FROM {} WHERE {} = ",
		assoc.table, assoc.owner
	));
	query.push_bind(owner_id).push(format!(" AND {} IN ", assoc.target));
	let mut query = push_in_ids(query, ids);
	query.build().execute(&mut *conn).await.map_err(db_err)?;
	Ok(())
}

/// Removes every edge pointing at `target_id`
pub(crate) async fn remove_target(
	conn: &mut SqliteConnection,
	assoc: &Assoc,
	target_id: i64,
) -> ClResult<()> {
	let sql = format!("DELETE FROM {} WHERE {} = ?", assoc.table, assoc.target);
	sqlx::query(&sql).bind(target_id).execute(&mut *conn).await.map_err(db_err)?;
	Ok(())
}

/// Removes every edge owned by `owner_id`
pub(crate) async fn remove_owner(
	conn: &mut SqliteConnection,
	assoc: &Assoc,
	owner_id: i64,
) -> ClResult<()> {
	let sql = format!("DELETE FROM {} WHERE {} = ?", assoc.table, assoc.owner);
	sqlx::query(&sql).bind(owner_id).execute(&mut *conn).await.map_err(db_err)?;
	Ok(())
}

// vim: ts=4
