//! Role management

use sqlx::{Row, SqliteConnection};

use crate::assoc;
use crate::utils::{collect_res, db_err, map_res, opt_str};
use quire_types::perm_adapter::{RoleData, RoleFields};
use quire_types::prelude::*;

pub(crate) async fn list(conn: &mut SqliteConnection) -> ClResult<Vec<RoleData>> {
	let rows = sqlx::query(
		"SELECT role_id, name, label, description, systemd FROM roles
		WHERE deleted_at IS NULL ORDER BY role_id",
	)
	.fetch_all(&mut *conn)
	.await
	.map_err(db_err)?;

	collect_res(rows.iter().map(|row| {
		Ok(RoleData {
			role_id: row.try_get("role_id")?,
			name: row.try_get::<String, _>("name")?.into(),
			label: opt_str(row.try_get("label")?),
			description: opt_str(row.try_get("description")?),
			systemd: row.try_get("systemd")?,
		})
	}))
}

pub(crate) async fn read_id(conn: &mut SqliteConnection, name: &str) -> ClResult<i64> {
	let res = sqlx::query("SELECT role_id FROM roles WHERE name = ? AND deleted_at IS NULL")
		.bind(name)
		.fetch_one(&mut *conn)
		.await;
	map_res(res, |row| row.try_get("role_id"))
}

pub(crate) async fn create(conn: &mut SqliteConnection, role: &RoleFields<'_>) -> ClResult<i64> {
	let res = sqlx::query(
		"INSERT INTO roles (name, label, description, systemd) VALUES (?, ?, ?, ?)
		ON CONFLICT (name) DO UPDATE SET
			label = excluded.label,
			description = excluded.description,
			systemd = excluded.systemd,
			deleted_at = NULL
		RETURNING role_id",
	)
	.bind(role.name)
	.bind(role.label)
	.bind(role.description)
	.bind(role.systemd)
	.fetch_one(&mut *conn)
	.await;
	map_res(res, |row| row.try_get("role_id"))
}

pub(crate) async fn update(
	conn: &mut SqliteConnection,
	role_id: i64,
	role: &RoleFields<'_>,
) -> ClResult<()> {
	let res = sqlx::query(
		"UPDATE roles SET name = ?, label = ?, description = ?, systemd = ?
		WHERE role_id = ? AND deleted_at IS NULL",
	)
	.bind(role.name)
	.bind(role.label)
	.bind(role.description)
	.bind(role.systemd)
	.bind(role_id)
	.execute(&mut *conn)
	.await
	.map_err(db_err)?;

	if res.rows_affected() == 0 {
		return Err(Error::NotFound);
	}
	Ok(())
}

/// Soft-deletes a role. Its edges are dropped so that re-creating the name
/// starts without members or permissions.
pub(crate) async fn delete(conn: &mut SqliteConnection, role_id: i64) -> ClResult<()> {
	assoc::remove_target(conn, &assoc::USER_ROLES, role_id).await?;
	assoc::remove_owner(conn, &assoc::ROLE_PERMISSIONS, role_id).await?;

	sqlx::query("UPDATE roles SET deleted_at = unixepoch() WHERE role_id = ?")
		.bind(role_id)
		.execute(&mut *conn)
		.await
		.map_err(db_err)?;
	Ok(())
}

// vim: ts=4
