//! SQLite-backed permission adapter
//!
//! Stores roles, permissions, menus, users and the association tables between
//! them. All reconciliation writes go through [`PermTxSqlite`], a thin wrapper
//! over a sqlx transaction.

use std::path::Path;

use async_trait::async_trait;
use sqlx::{
	Sqlite, SqlitePool, Transaction,
	sqlite::{self, SqliteConnection},
};

use quire_types::perm_adapter::{
	MenuData, MenuFields, PermAdapter, PermTx, PermissionData, PermissionFields, Principal,
	RoleData, RoleFields,
};
use quire_types::prelude::*;
use quire_types::types::RowId;

mod assoc;
mod menu;
mod permission;
mod principal;
mod role;
mod schema;
mod user;
mod utils;

use crate::utils::db_err;

const DB_FILE: &str = "perm.db";

#[derive(Debug)]
pub struct PermAdapterSqlite {
	db: SqlitePool,
}

impl PermAdapterSqlite {
	/// Opens (or creates) `perm.db` inside `dir`
	pub async fn new(dir: impl AsRef<Path>) -> ClResult<Self> {
		let dir = dir.as_ref();
		tokio::fs::create_dir_all(dir).await?;

		let opts = sqlite::SqliteConnectOptions::new()
			.filename(dir.join(DB_FILE))
			.create_if_missing(true)
			.journal_mode(sqlite::SqliteJournalMode::Wal);
		let db = sqlite::SqlitePoolOptions::new()
			.max_connections(5)
			.connect_with(opts)
			.await
			.inspect_err(|err| error!("DbError: {:#?}", err))
			.map_err(|_| Error::DbError)?;

		schema::init_db(&db)
			.await
			.inspect_err(|err| error!("DbError: {:#?}", err))
			.map_err(|_| Error::DbError)?;

		Ok(Self { db })
	}

	async fn acquire(&self) -> ClResult<sqlx::pool::PoolConnection<Sqlite>> {
		self.db.acquire().await.map_err(db_err)
	}
}

/// Transaction over the authorization tables
pub struct PermTxSqlite {
	tx: Transaction<'static, Sqlite>,
}

impl PermTxSqlite {
	fn conn(&mut self) -> &mut SqliteConnection {
		&mut *self.tx
	}
}

#[async_trait]
impl PermTx for PermTxSqlite {
	// Roles
	//*******
	async fn list_roles(&mut self) -> ClResult<Vec<RoleData>> {
		role::list(self.conn()).await
	}

	async fn create_role(&mut self, role: &RoleFields<'_>) -> ClResult<RowId> {
		role::create(self.conn(), role).await
	}

	async fn update_role(&mut self, role_id: RowId, role: &RoleFields<'_>) -> ClResult<()> {
		role::update(self.conn(), role_id, role).await
	}

	async fn delete_role(&mut self, role_id: RowId) -> ClResult<()> {
		role::delete(self.conn(), role_id).await
	}

	async fn list_role_permissions(&mut self, role_id: RowId) -> ClResult<Vec<RowId>> {
		assoc::list(self.conn(), &assoc::ROLE_PERMISSIONS, role_id).await
	}

	async fn add_role_permissions(&mut self, role_id: RowId, perm_ids: &[RowId]) -> ClResult<()> {
		assoc::add(self.conn(), &assoc::ROLE_PERMISSIONS, role_id, perm_ids).await
	}

	async fn remove_role_permissions(
		&mut self,
		role_id: RowId,
		perm_ids: &[RowId],
	) -> ClResult<()> {
		assoc::remove(self.conn(), &assoc::ROLE_PERMISSIONS, role_id, perm_ids).await
	}

	// Permissions
	//*************
	async fn list_permissions(&mut self) -> ClResult<Vec<PermissionData>> {
		permission::list(self.conn()).await
	}

	async fn create_permission(&mut self, perm: &PermissionFields<'_>) -> ClResult<RowId> {
		permission::create(self.conn(), perm).await
	}

	async fn update_permission(
		&mut self,
		perm_id: RowId,
		perm: &PermissionFields<'_>,
	) -> ClResult<()> {
		permission::update(self.conn(), perm_id, perm).await
	}

	async fn delete_permission(&mut self, perm_id: RowId) -> ClResult<()> {
		permission::delete(self.conn(), perm_id).await
	}

	// Menus
	//*******
	async fn list_menus(&mut self) -> ClResult<Vec<MenuData>> {
		menu::list(self.conn()).await
	}

	async fn create_menu(&mut self, menu: &MenuFields<'_>) -> ClResult<RowId> {
		menu::create(self.conn(), menu).await
	}

	async fn update_menu(&mut self, menu_id: RowId, menu: &MenuFields<'_>) -> ClResult<()> {
		menu::update(self.conn(), menu_id, menu).await
	}

	async fn delete_menu(&mut self, menu_id: RowId) -> ClResult<()> {
		menu::delete(self.conn(), menu_id).await
	}

	async fn list_menu_permissions(&mut self, menu_id: RowId) -> ClResult<Vec<RowId>> {
		assoc::list(self.conn(), &assoc::MENU_PERMISSIONS, menu_id).await
	}

	async fn add_menu_permissions(&mut self, menu_id: RowId, perm_ids: &[RowId]) -> ClResult<()> {
		assoc::add(self.conn(), &assoc::MENU_PERMISSIONS, menu_id, perm_ids).await
	}

	async fn remove_menu_permissions(
		&mut self,
		menu_id: RowId,
		perm_ids: &[RowId],
	) -> ClResult<()> {
		assoc::remove(self.conn(), &assoc::MENU_PERMISSIONS, menu_id, perm_ids).await
	}

	// Users
	//*******
	async fn find_user(&mut self, username: &str) -> ClResult<Option<UserId>> {
		user::find(self.conn(), username).await
	}

	async fn list_user_roles(&mut self, user_id: UserId) -> ClResult<Vec<RowId>> {
		assoc::list(self.conn(), &assoc::USER_ROLES, user_id.0).await
	}

	async fn add_user_roles(&mut self, user_id: UserId, role_ids: &[RowId]) -> ClResult<()> {
		assoc::add(self.conn(), &assoc::USER_ROLES, user_id.0, role_ids).await
	}

	async fn commit(self: Box<Self>) -> ClResult<()> {
		self.tx.commit().await.map_err(db_err)
	}
}

#[async_trait]
impl PermAdapter for PermAdapterSqlite {
	async fn begin(&self) -> ClResult<Box<dyn PermTx>> {
		let tx = self.db.begin().await.map_err(db_err)?;
		Ok(Box::new(PermTxSqlite { tx }))
	}

	async fn load_principal(&self, user_id: UserId) -> ClResult<Principal> {
		let mut conn = self.acquire().await?;
		principal::load(&mut conn, user_id).await
	}

	async fn list_menus(&self) -> ClResult<Vec<MenuData>> {
		let mut conn = self.acquire().await?;
		menu::list(&mut conn).await
	}

	async fn list_roles(&self) -> ClResult<Vec<RoleData>> {
		let mut conn = self.acquire().await?;
		role::list(&mut conn).await
	}

	// User administration
	//*********************
	async fn create_user(&self, username: &str) -> ClResult<UserId> {
		let mut conn = self.acquire().await?;
		user::create(&mut conn, username).await
	}

	async fn read_user_id(&self, username: &str) -> ClResult<UserId> {
		let mut conn = self.acquire().await?;
		user::find(&mut conn, username).await?.ok_or(Error::NotFound)
	}

	async fn create_custom_role(&self, name: &str, label: Option<&str>) -> ClResult<RowId> {
		let mut conn = self.acquire().await?;
		match role::read_id(&mut conn, name).await {
			Ok(_) => {
				return Err(Error::ValidationError(format!("role '{}' already exists", name)));
			}
			Err(Error::NotFound) => (),
			Err(err) => return Err(err),
		}
		let role = RoleFields { name, label, description: None, systemd: false };
		role::create(&mut conn, &role).await
	}

	async fn grant_role(&self, user_id: UserId, role_name: &str) -> ClResult<()> {
		let mut conn = self.acquire().await?;
		let role_id = role::read_id(&mut conn, role_name).await?;
		assoc::add(&mut conn, &assoc::USER_ROLES, user_id.0, &[role_id]).await
	}

	async fn grant_permission(&self, user_id: UserId, perm_name: &str) -> ClResult<()> {
		let mut conn = self.acquire().await?;
		let perm_id = permission::read_id(&mut conn, perm_name).await?;
		assoc::add(&mut conn, &assoc::USER_PERMISSIONS, user_id.0, &[perm_id]).await
	}

	async fn grant_role_permission(&self, role_name: &str, perm_name: &str) -> ClResult<()> {
		let mut conn = self.acquire().await?;
		let role_id = role::read_id(&mut conn, role_name).await?;
		let perm_id = permission::read_id(&mut conn, perm_name).await?;
		assoc::add(&mut conn, &assoc::ROLE_PERMISSIONS, role_id, &[perm_id]).await
	}
}

// vim: ts=4
