//! Database schema initialization
//!
//! Creates tables and indexes if they don't exist yet. Runs in a single
//! transaction so a half-initialized database is never left behind.

use sqlx::SqlitePool;

pub(crate) async fn init_db(db: &SqlitePool) -> Result<(), sqlx::Error> {
	let mut tx = db.begin().await?;

	// Users
	//*******
	sqlx::query(
		"CREATE TABLE IF NOT EXISTS users (
		user_id integer PRIMARY KEY AUTOINCREMENT,
		username text NOT NULL,
		created_at datetime DEFAULT (unixepoch())
	)",
	)
	.execute(&mut *tx)
	.await?;
	sqlx::query("CREATE UNIQUE INDEX IF NOT EXISTS idx_users_username ON users(username)")
		.execute(&mut *tx)
		.await?;

	// Roles
	//*******
	sqlx::query(
		"CREATE TABLE IF NOT EXISTS roles (
		role_id integer PRIMARY KEY AUTOINCREMENT,
		name text NOT NULL,
		label text,
		description text,
		systemd boolean NOT NULL DEFAULT 0,
		created_at datetime DEFAULT (unixepoch()),
		deleted_at datetime
	)",
	)
	.execute(&mut *tx)
	.await?;
	sqlx::query("CREATE UNIQUE INDEX IF NOT EXISTS idx_roles_name ON roles(name)")
		.execute(&mut *tx)
		.await?;

	// Permissions
	//*************
	sqlx::query(
		"CREATE TABLE IF NOT EXISTS permissions (
		perm_id integer PRIMARY KEY AUTOINCREMENT,
		name text NOT NULL,
		label text,
		description text,
		rule json NOT NULL,
		parent_id integer,
		mpath text NOT NULL DEFAULT '',
		custom_order integer NOT NULL DEFAULT 0
	)",
	)
	.execute(&mut *tx)
	.await?;
	sqlx::query("CREATE UNIQUE INDEX IF NOT EXISTS idx_permissions_name ON permissions(name)")
		.execute(&mut *tx)
		.await?;
	sqlx::query("CREATE INDEX IF NOT EXISTS idx_permissions_mpath ON permissions(mpath)")
		.execute(&mut *tx)
		.await?;

	// Menus
	//*******
	sqlx::query(
		"CREATE TABLE IF NOT EXISTS menus (
		menu_id integer PRIMARY KEY AUTOINCREMENT,
		name text NOT NULL,
		label text,
		path text,
		icon text,
		parent_id integer,
		mpath text NOT NULL DEFAULT '',
		custom_order integer NOT NULL DEFAULT 0,
		systemd boolean NOT NULL DEFAULT 0
	)",
	)
	.execute(&mut *tx)
	.await?;
	sqlx::query("CREATE UNIQUE INDEX IF NOT EXISTS idx_menus_name ON menus(name)")
		.execute(&mut *tx)
		.await?;
	sqlx::query("CREATE INDEX IF NOT EXISTS idx_menus_mpath ON menus(mpath)")
		.execute(&mut *tx)
		.await?;

	// Associations
	//**************
	sqlx::query(
		"CREATE TABLE IF NOT EXISTS role_permissions (
		role_id integer NOT NULL,
		perm_id integer NOT NULL,
		PRIMARY KEY(role_id, perm_id)
	)",
	)
	.execute(&mut *tx)
	.await?;

	sqlx::query(
		"CREATE TABLE IF NOT EXISTS menu_permissions (
		menu_id integer NOT NULL,
		perm_id integer NOT NULL,
		PRIMARY KEY(menu_id, perm_id)
	)",
	)
	.execute(&mut *tx)
	.await?;

	sqlx::query(
		"CREATE TABLE IF NOT EXISTS user_roles (
		user_id integer NOT NULL,
		role_id integer NOT NULL,
		PRIMARY KEY(user_id, role_id)
	)",
	)
	.execute(&mut *tx)
	.await?;

	sqlx::query(
		"CREATE TABLE IF NOT EXISTS user_permissions (
		user_id integer NOT NULL,
		perm_id integer NOT NULL,
		PRIMARY KEY(user_id, perm_id)
	)",
	)
	.execute(&mut *tx)
	.await?;

	tx.commit().await?;

	Ok(())
}

// vim: ts=4
