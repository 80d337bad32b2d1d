//! Principal loading
//!
//! A principal is a user together with its active roles, the permissions of
//! those roles, and the permissions granted to the user directly.

use std::collections::HashMap;

use sqlx::{Row, SqliteConnection};

use crate::user;
use crate::utils::{collect_res, db_err, parse_rule};
use quire_types::perm_adapter::{Principal, PrincipalPermission, PrincipalRole};
use quire_types::prelude::*;

pub(crate) async fn load(conn: &mut SqliteConnection, user_id: UserId) -> ClResult<Principal> {
	let username = user::read_username(conn, user_id).await?;

	let rows = sqlx::query(
		"SELECT r.role_id, r.name FROM user_roles ur
		JOIN roles r ON r.role_id = ur.role_id
		WHERE ur.user_id = ? AND r.deleted_at IS NULL
		ORDER BY r.role_id",
	)
	.bind(user_id.0)
	.fetch_all(&mut *conn)
	.await
	.map_err(db_err)?;
	let mut roles = collect_res(rows.iter().map(|row| {
		Ok(PrincipalRole {
			role_id: row.try_get("role_id")?,
			name: row.try_get::<String, _>("name")?.into(),
			permissions: Vec::new(),
		})
	}))?;

	let rows = sqlx::query(
		"SELECT rp.role_id, p.perm_id, p.name, p.rule FROM user_roles ur
		JOIN role_permissions rp ON rp.role_id = ur.role_id
		JOIN permissions p ON p.perm_id = rp.perm_id
		WHERE ur.user_id = ?
		ORDER BY p.mpath, p.custom_order, p.perm_id",
	)
	.bind(user_id.0)
	.fetch_all(&mut *conn)
	.await
	.map_err(db_err)?;
	let mut by_role: HashMap<i64, Vec<PrincipalPermission>> = HashMap::new();
	for (role_id, perm) in collect_res(rows.iter().map(|row| {
		Ok((row.try_get::<i64, _>("role_id")?, read_permission(row)?))
	}))? {
		by_role.entry(role_id).or_default().push(perm);
	}
	for role in &mut roles {
		if let Some(perms) = by_role.remove(&role.role_id) {
			role.permissions = perms;
		}
	}

	let rows = sqlx::query(
		"SELECT p.perm_id, p.name, p.rule FROM user_permissions up
		JOIN permissions p ON p.perm_id = up.perm_id
		WHERE up.user_id = ?
		ORDER BY p.mpath, p.custom_order, p.perm_id",
	)
	.bind(user_id.0)
	.fetch_all(&mut *conn)
	.await
	.map_err(db_err)?;
	let permissions = collect_res(rows.iter().map(read_permission))?;

	Ok(Principal { id: user_id, username, roles, permissions })
}

fn read_permission(row: &sqlx::sqlite::SqliteRow) -> Result<PrincipalPermission, sqlx::Error> {
	Ok(PrincipalPermission {
		perm_id: row.try_get("perm_id")?,
		name: row.try_get::<String, _>("name")?.into(),
		rule: parse_rule(row.try_get("rule")?)?,
	})
}

// vim: ts=4
