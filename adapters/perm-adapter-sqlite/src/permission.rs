//! Permission management

use sqlx::{Row, SqliteConnection};

use crate::assoc;
use crate::utils::{collect_res, db_err, map_res, opt_str, parse_rule, serialize_rule};
use quire_types::perm_adapter::{PermissionData, PermissionFields};
use quire_types::prelude::*;

pub(crate) async fn list(conn: &mut SqliteConnection) -> ClResult<Vec<PermissionData>> {
	let rows = sqlx::query(
		"SELECT perm_id, name, label, description, rule, parent_id, mpath, custom_order
		FROM permissions ORDER BY mpath, custom_order, perm_id",
	)
	.fetch_all(&mut *conn)
	.await
	.map_err(db_err)?;

	collect_res(rows.iter().map(|row| {
		Ok(PermissionData {
			perm_id: row.try_get("perm_id")?,
			name: row.try_get::<String, _>("name")?.into(),
			label: opt_str(row.try_get("label")?),
			description: opt_str(row.try_get("description")?),
			rule: parse_rule(row.try_get("rule")?)?,
			parent_id: row.try_get("parent_id")?,
			mpath: row.try_get::<String, _>("mpath")?.into(),
			custom_order: row.try_get("custom_order")?,
		})
	}))
}

pub(crate) async fn read_id(conn: &mut SqliteConnection, name: &str) -> ClResult<i64> {
	let res = sqlx::query("SELECT perm_id FROM permissions WHERE name = ?")
		.bind(name)
		.fetch_one(&mut *conn)
		.await;
	map_res(res, |row| row.try_get("perm_id"))
}

pub(crate) async fn create(
	conn: &mut SqliteConnection,
	perm: &PermissionFields<'_>,
) -> ClResult<i64> {
	let rule = serialize_rule(perm.rule)?;
	let res = sqlx::query(
		"INSERT INTO permissions (name, label, description, rule, parent_id, mpath, custom_order)
		VALUES (?, ?, ?, ?, ?, ?, ?)
		RETURNING perm_id",
	)
	.bind(perm.name)
	.bind(perm.label)
	.bind(perm.description)
	.bind(rule)
	.bind(perm.parent_id)
	.bind(perm.mpath)
	.bind(perm.custom_order)
	.fetch_one(&mut *conn)
	.await;
	map_res(res, |row| row.try_get("perm_id"))
}

pub(crate) async fn update(
	conn: &mut SqliteConnection,
	perm_id: i64,
	perm: &PermissionFields<'_>,
) -> ClResult<()> {
	let rule = serialize_rule(perm.rule)?;
	let res = sqlx::query(
		"UPDATE permissions SET name = ?, label = ?, description = ?, rule = ?,
			parent_id = ?, mpath = ?, custom_order = ?
		WHERE perm_id = ?",
	)
	.bind(perm.name)
	.bind(perm.label)
	.bind(perm.description)
	.bind(rule)
	.bind(perm.parent_id)
	.bind(perm.mpath)
	.bind(perm.custom_order)
	.bind(perm_id)
	.execute(&mut *conn)
	.await
	.map_err(db_err)?;

	if res.rows_affected() == 0 {
		return Err(Error::NotFound);
	}
	Ok(())
}

pub(crate) async fn delete(conn: &mut SqliteConnection, perm_id: i64) -> ClResult<()> {
	assoc::remove_target(conn, &assoc::ROLE_PERMISSIONS, perm_id).await?;
	assoc::remove_target(conn, &assoc::MENU_PERMISSIONS, perm_id).await?;
	assoc::remove_target(conn, &assoc::USER_PERMISSIONS, perm_id).await?;

	// Orphaned children become roots until the next sync re-parents them
	sqlx::query("UPDATE permissions SET parent_id = NULL WHERE parent_id = ?")
		.bind(perm_id)
		.execute(&mut *conn)
		.await
		.map_err(db_err)?;
	sqlx::query("DELETE FROM permissions WHERE perm_id = ?")
		.bind(perm_id)
		.execute(&mut *conn)
		.await
		.map_err(db_err)?;
	Ok(())
}

// vim: ts=4
