//! Menu management

use std::collections::HashMap;

use sqlx::{Row, SqliteConnection};

use crate::assoc;
use crate::utils::{collect_res, db_err, map_res, opt_str};
use quire_types::perm_adapter::{MenuData, MenuFields};
use quire_types::prelude::*;

pub(crate) async fn list(conn: &mut SqliteConnection) -> ClResult<Vec<MenuData>> {
	let rows = sqlx::query(
		"SELECT menu_id, name, label, path, icon, parent_id, mpath, custom_order, systemd
		FROM menus ORDER BY mpath, custom_order, menu_id",
	)
	.fetch_all(&mut *conn)
	.await
	.map_err(db_err)?;

	let mut menus = collect_res(rows.iter().map(|row| {
		Ok(MenuData {
			menu_id: row.try_get("menu_id")?,
			name: row.try_get::<String, _>("name")?.into(),
			label: opt_str(row.try_get("label")?),
			path: opt_str(row.try_get("path")?),
			icon: opt_str(row.try_get("icon")?),
			parent_id: row.try_get("parent_id")?,
			mpath: row.try_get::<String, _>("mpath")?.into(),
			custom_order: row.try_get("custom_order")?,
			systemd: row.try_get("systemd")?,
			permissions: Vec::new(),
		})
	}))?;

	let rows = sqlx::query(
		"SELECT mp.menu_id, p.name FROM menu_permissions mp
		JOIN permissions p ON p.perm_id = mp.perm_id
		ORDER BY mp.menu_id, p.name",
	)
	.fetch_all(&mut *conn)
	.await
	.map_err(db_err)?;

	let mut perms: HashMap<i64, Vec<Box<str>>> = HashMap::new();
	for (menu_id, name) in collect_res(rows.iter().map(|row| {
		Ok((row.try_get::<i64, _>("menu_id")?, row.try_get::<String, _>("name")?))
	}))? {
		perms.entry(menu_id).or_default().push(name.into());
	}
	for menu in &mut menus {
		if let Some(names) = perms.remove(&menu.menu_id) {
			menu.permissions = names;
		}
	}

	Ok(menus)
}

pub(crate) async fn create(conn: &mut SqliteConnection, menu: &MenuFields<'_>) -> ClResult<i64> {
	let res = sqlx::query(
		"INSERT INTO menus (name, label, path, icon, parent_id, mpath, custom_order, systemd)
		VALUES (?, ?, ?, ?, ?, ?, ?, ?)
		RETURNING menu_id",
	)
	.bind(menu.name)
	.bind(menu.label)
	.bind(menu.path)
	.bind(menu.icon)
	.bind(menu.parent_id)
	.bind(menu.mpath)
	.bind(menu.custom_order)
	.bind(menu.systemd)
	.fetch_one(&mut *conn)
	.await;
	map_res(res, |row| row.try_get("menu_id"))
}

pub(crate) async fn update(
	conn: &mut SqliteConnection,
	menu_id: i64,
	menu: &MenuFields<'_>,
) -> ClResult<()> {
	let res = sqlx::query(
		"UPDATE menus SET name = ?, label = ?, path = ?, icon = ?, parent_id = ?,
			mpath = ?, custom_order = ?, systemd = ?
		WHERE menu_id = ?",
	)
	.bind(menu.name)
	.bind(menu.label)
	.bind(menu.path)
	.bind(menu.icon)
	.bind(menu.parent_id)
	.bind(menu.mpath)
	.bind(menu.custom_order)
	.bind(menu.systemd)
	.bind(menu_id)
	.execute(&mut *conn)
	.await
	.map_err(db_err)?;

	if res.rows_affected() == 0 {
		return Err(Error::NotFound);
	}
	Ok(())
}

pub(crate) async fn delete(conn: &mut SqliteConnection, menu_id: i64) -> ClResult<()> {
	assoc::remove_owner(conn, &assoc::MENU_PERMISSIONS, menu_id).await?;

	sqlx::query("UPDATE menus SET parent_id = NULL WHERE parent_id = ?")
		.bind(menu_id)
		.execute(&mut *conn)
		.await
		.map_err(db_err)?;
	sqlx::query("DELETE FROM menus WHERE menu_id = ?")
		.bind(menu_id)
		.execute(&mut *conn)
		.await
		.map_err(db_err)?;
	Ok(())
}

// vim: ts=4
