//! Adapter that stores roles, permissions, menus and their associations.
//!
//! Reconciliation at boot goes through a [`PermTx`] obtained from
//! [`PermAdapter::begin`]. Dropping a transaction without calling
//! [`PermTx::commit`] rolls it back.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use std::fmt::Debug;

use crate::prelude::*;
use crate::types::RowId;

/// Persisted shape of a permission rule.
///
/// Conditions are principal-dependent closures and only live in the
/// in-memory registry, so they are never part of this type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredRule {
	pub action: Box<str>,
	pub subject: Vec<Box<str>>,
}

// Read models //
//*************//
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize)]
pub struct RoleData {
	pub role_id: RowId,
	pub name: Box<str>,
	pub label: Option<Box<str>>,
	pub description: Option<Box<str>>,
	pub systemd: bool,
}

#[skip_serializing_none]
#[derive(Debug, Clone, Serialize)]
pub struct PermissionData {
	pub perm_id: RowId,
	pub name: Box<str>,
	pub label: Option<Box<str>>,
	pub description: Option<Box<str>>,
	pub rule: StoredRule,
	pub parent_id: Option<RowId>,
	pub mpath: Box<str>,
	pub custom_order: i64,
}

#[skip_serializing_none]
#[derive(Debug, Clone, Serialize)]
pub struct MenuData {
	pub menu_id: RowId,
	pub name: Box<str>,
	pub label: Option<Box<str>>,
	pub path: Option<Box<str>>,
	pub icon: Option<Box<str>>,
	pub parent_id: Option<RowId>,
	pub mpath: Box<str>,
	pub custom_order: i64,
	pub systemd: bool,
	/// Names of the permissions associated with this menu
	pub permissions: Vec<Box<str>>,
}

// Write models //
//**************//
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleFields<'a> {
	pub name: &'a str,
	pub label: Option<&'a str>,
	pub description: Option<&'a str>,
	pub systemd: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionFields<'a> {
	pub name: &'a str,
	pub label: Option<&'a str>,
	pub description: Option<&'a str>,
	pub rule: &'a StoredRule,
	pub parent_id: Option<RowId>,
	pub mpath: &'a str,
	pub custom_order: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuFields<'a> {
	pub name: &'a str,
	pub label: Option<&'a str>,
	pub path: Option<&'a str>,
	pub icon: Option<&'a str>,
	pub parent_id: Option<RowId>,
	pub mpath: &'a str,
	pub custom_order: i64,
	pub systemd: bool,
}

// Principal //
//***********//
#[derive(Debug, Clone, Serialize)]
pub struct PrincipalPermission {
	pub perm_id: RowId,
	pub name: Box<str>,
	pub rule: StoredRule,
}

#[derive(Debug, Clone, Serialize)]
pub struct PrincipalRole {
	pub role_id: RowId,
	pub name: Box<str>,
	pub permissions: Vec<PrincipalPermission>,
}

/// A fully loaded user: roles with their nested permissions plus the
/// permissions granted to the user directly.
#[derive(Debug, Clone, Serialize)]
pub struct Principal {
	pub id: UserId,
	pub username: Box<str>,
	pub roles: Vec<PrincipalRole>,
	pub permissions: Vec<PrincipalPermission>,
}

impl Principal {
	pub fn has_role(&self, name: &str) -> bool {
		self.roles.iter().any(|role| role.name.as_ref() == name)
	}
}

/// Transaction over the authorization tables
#[async_trait]
pub trait PermTx: Send {
	// Roles
	//*******
	/// Lists roles that are not soft-deleted
	async fn list_roles(&mut self) -> ClResult<Vec<RoleData>>;
	/// Creates a role. A soft-deleted role with the same name is restored.
	async fn create_role(&mut self, role: &RoleFields<'_>) -> ClResult<RowId>;
	async fn update_role(&mut self, role_id: RowId, role: &RoleFields<'_>) -> ClResult<()>;
	/// Soft-deletes a role
	async fn delete_role(&mut self, role_id: RowId) -> ClResult<()>;
	async fn list_role_permissions(&mut self, role_id: RowId) -> ClResult<Vec<RowId>>;
	async fn add_role_permissions(&mut self, role_id: RowId, perm_ids: &[RowId]) -> ClResult<()>;
	async fn remove_role_permissions(
		&mut self,
		role_id: RowId,
		perm_ids: &[RowId],
	) -> ClResult<()>;

	// Permissions
	//*************
	async fn list_permissions(&mut self) -> ClResult<Vec<PermissionData>>;
	async fn create_permission(&mut self, perm: &PermissionFields<'_>) -> ClResult<RowId>;
	async fn update_permission(
		&mut self,
		perm_id: RowId,
		perm: &PermissionFields<'_>,
	) -> ClResult<()>;
	/// Deletes a permission together with all of its association edges
	async fn delete_permission(&mut self, perm_id: RowId) -> ClResult<()>;

	// Menus
	//*******
	async fn list_menus(&mut self) -> ClResult<Vec<MenuData>>;
	async fn create_menu(&mut self, menu: &MenuFields<'_>) -> ClResult<RowId>;
	async fn update_menu(&mut self, menu_id: RowId, menu: &MenuFields<'_>) -> ClResult<()>;
	async fn delete_menu(&mut self, menu_id: RowId) -> ClResult<()>;
	async fn list_menu_permissions(&mut self, menu_id: RowId) -> ClResult<Vec<RowId>>;
	async fn add_menu_permissions(&mut self, menu_id: RowId, perm_ids: &[RowId]) -> ClResult<()>;
	async fn remove_menu_permissions(
		&mut self,
		menu_id: RowId,
		perm_ids: &[RowId],
	) -> ClResult<()>;

	// Users
	//*******
	async fn find_user(&mut self, username: &str) -> ClResult<Option<UserId>>;
	async fn list_user_roles(&mut self, user_id: UserId) -> ClResult<Vec<RowId>>;
	async fn add_user_roles(&mut self, user_id: UserId, role_ids: &[RowId]) -> ClResult<()>;

	async fn commit(self: Box<Self>) -> ClResult<()>;
}

#[async_trait]
pub trait PermAdapter: Debug + Send + Sync {
	/// Opens a transaction over the authorization tables
	async fn begin(&self) -> ClResult<Box<dyn PermTx>>;

	/// Loads a user with roles, nested role permissions and direct permissions.
	/// Soft-deleted roles are not part of the principal.
	async fn load_principal(&self, user_id: UserId) -> ClResult<Principal>;

	/// Lists all menus with their associated permission names, ordered by
	/// materialized path
	async fn list_menus(&self) -> ClResult<Vec<MenuData>>;

	/// Lists roles that are not soft-deleted
	async fn list_roles(&self) -> ClResult<Vec<RoleData>>;

	// User administration
	//*********************
	async fn create_user(&self, username: &str) -> ClResult<UserId>;
	async fn read_user_id(&self, username: &str) -> ClResult<UserId>;
	/// Creates an administrator-managed role (`systemd = false`)
	async fn create_custom_role(&self, name: &str, label: Option<&str>) -> ClResult<RowId>;
	async fn grant_role(&self, user_id: UserId, role_name: &str) -> ClResult<()>;
	async fn grant_permission(&self, user_id: UserId, perm_name: &str) -> ClResult<()>;
	async fn grant_role_permission(&self, role_name: &str, perm_name: &str) -> ClResult<()>;
}

// vim: ts=4
