//! Boot-time reconciliation of the registry into storage
//!
//! Runs once per server start, before traffic is accepted. All three passes
//! share one transaction; any error drops it, which rolls everything back.
//! Rows that already match the registry are not rewritten, so a second run
//! against the same registry reports no changes.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use quire_types::perm_adapter::{
	MenuData, MenuFields, PermAdapter, PermTx, PermissionData, PermissionFields, RoleFields,
};
use quire_types::types::RowId;

use crate::core_perms::{SUPER_ADMIN_ROLE, SYSTEM_MANAGE};
use crate::prelude::*;
use crate::registry::FrozenPermissionRegistry;
use crate::tree;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EntityCounts {
	pub created: usize,
	pub updated: usize,
	pub deleted: usize,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SyncReport {
	pub roles: EntityCounts,
	pub permissions: EntityCounts,
	pub menus: EntityCounts,
	/// Role, menu and user association edges
	pub edges_added: usize,
	pub edges_removed: usize,
}

impl SyncReport {
	pub fn is_unchanged(&self) -> bool {
		*self == Self::default()
	}
}

/// Reconciles roles, permissions and menus. `admin_user` is granted the
/// super-admin role if that user exists.
pub async fn sync(
	adapter: &dyn PermAdapter,
	registry: &FrozenPermissionRegistry,
	admin_user: Option<&str>,
) -> ClResult<SyncReport> {
	let mut tx = adapter.begin().await?;
	let mut report = SyncReport::default();

	sync_roles(tx.as_mut(), registry, &mut report).await?;
	sync_permissions(tx.as_mut(), registry, admin_user, &mut report).await?;
	sync_menus(tx.as_mut(), registry, &mut report).await?;

	tx.commit().await?;
	info!(
		roles = ?report.roles,
		permissions = ?report.permissions,
		menus = ?report.menus,
		edges_added = report.edges_added,
		edges_removed = report.edges_removed,
		"Permission sync finished"
	);
	Ok(report)
}

/// Returns `(add, remove)` turning `current` into `wanted`
fn diff(current: &[RowId], wanted: &[RowId]) -> (Vec<RowId>, Vec<RowId>) {
	let current_set: HashSet<RowId> = current.iter().copied().collect();
	let wanted_set: HashSet<RowId> = wanted.iter().copied().collect();
	let mut add: Vec<RowId> = Vec::new();
	for id in wanted {
		if !current_set.contains(id) && !add.contains(id) {
			add.push(*id);
		}
	}
	let remove = current.iter().copied().filter(|id| !wanted_set.contains(id)).collect();
	(add, remove)
}

/// Resolves permission names to ids. Unknown names are skipped.
fn resolve_permissions(
	names: &[Box<str>],
	perm_ids: &HashMap<&str, RowId>,
	owner_kind: &str,
	owner: &str,
) -> Vec<RowId> {
	names
		.iter()
		.filter_map(|name| {
			let id = perm_ids.get(name.as_ref()).copied();
			if id.is_none() {
				warn!("{} '{}' refers to unknown permission '{}', skipped", owner_kind, owner, name);
			}
			id
		})
		.collect()
}

// Roles //
//*******//
async fn sync_roles(
	tx: &mut dyn PermTx,
	registry: &FrozenPermissionRegistry,
	report: &mut SyncReport,
) -> ClResult<()> {
	let existing = tx.list_roles().await?;
	let by_name: HashMap<&str, _> = existing.iter().map(|row| (row.name.as_ref(), row)).collect();

	for def in registry.roles() {
		let fields = RoleFields {
			name: &def.name,
			label: def.label.as_deref(),
			description: def.description.as_deref(),
			systemd: true,
		};
		match by_name.get(def.name.as_ref()) {
			Some(row)
				if row.systemd
					&& row.label.as_deref() == fields.label
					&& row.description.as_deref() == fields.description => {}
			Some(row) => {
				tx.update_role(row.role_id, &fields).await?;
				report.roles.updated += 1;
			}
			None => {
				let role_id = tx.create_role(&fields).await?;
				debug!(role_id, name = %def.name, "Role created");
				report.roles.created += 1;
			}
		}
	}

	for row in existing.iter().filter(|row| row.systemd && registry.role(&row.name).is_none()) {
		tx.delete_role(row.role_id).await?;
		info!(name = %row.name, "Role no longer registered, deleted");
		report.roles.deleted += 1;
	}
	Ok(())
}

// Permissions //
//*************//
fn permission_changed(row: &PermissionData, fields: &PermissionFields<'_>) -> bool {
	row.label.as_deref() != fields.label
		|| row.description.as_deref() != fields.description
		|| &row.rule != fields.rule
		|| row.parent_id != fields.parent_id
		|| row.mpath.as_ref() != fields.mpath
		|| row.custom_order != fields.custom_order
}

async fn sync_permissions(
	tx: &mut dyn PermTx,
	registry: &FrozenPermissionRegistry,
	admin_user: Option<&str>,
	report: &mut SyncReport,
) -> ClResult<()> {
	let ordered = tree::order_by_parent(
		registry.permissions(),
		"permission",
		|perm| perm.name.as_ref(),
		|perm| perm.parent.as_deref(),
	)?;
	let existing = tx.list_permissions().await?;
	let by_name: HashMap<&str, &PermissionData> =
		existing.iter().map(|row| (row.name.as_ref(), row)).collect();
	// Resolved id and path of every permission written so far
	let mut placed: HashMap<&str, (RowId, String)> = HashMap::new();

	for def in ordered {
		let (parent_id, parent_mpath) = match def.parent.as_deref() {
			Some(parent) => {
				let (id, mpath) = placed.get(parent).ok_or_else(|| {
					Error::ConfigError(format!("permission parent '{}' not placed", parent))
				})?;
				(Some(*id), Some(mpath.clone()))
			}
			None => (None, None),
		};
		let rule = def.stored_rule();
		let mut fields = PermissionFields {
			name: &def.name,
			label: def.label.as_deref(),
			description: def.description.as_deref(),
			rule: &rule,
			parent_id,
			mpath: "",
			custom_order: def.custom_order.unwrap_or(0),
		};

		let (perm_id, mpath) = if let Some(row) = by_name.get(def.name.as_ref()) {
			let mpath = tree::child_mpath(parent_mpath.as_deref(), row.perm_id);
			fields.mpath = &mpath;
			if permission_changed(row, &fields) {
				tx.update_permission(row.perm_id, &fields).await?;
				report.permissions.updated += 1;
			}
			(row.perm_id, mpath)
		} else {
			// The path contains the row's own id, so it is set after insert
			let perm_id = tx.create_permission(&fields).await?;
			let mpath = tree::child_mpath(parent_mpath.as_deref(), perm_id);
			fields.mpath = &mpath;
			tx.update_permission(perm_id, &fields).await?;
			debug!(perm_id, name = %def.name, "Permission created");
			report.permissions.created += 1;
			(perm_id, mpath)
		};
		placed.insert(def.name.as_ref(), (perm_id, mpath));
	}

	for row in &existing {
		if row.name.as_ref() == SYSTEM_MANAGE || registry.permission(&row.name).is_some() {
			continue;
		}
		tx.delete_permission(row.perm_id).await?;
		info!(name = %row.name, "Permission no longer registered, deleted");
		report.permissions.deleted += 1;
	}

	let permissions = tx.list_permissions().await?;
	let perm_ids: HashMap<&str, RowId> =
		permissions.iter().map(|row| (row.name.as_ref(), row.perm_id)).collect();
	let roles = tx.list_roles().await?;

	for role in &roles {
		if role.name.as_ref() == SUPER_ADMIN_ROLE {
			continue;
		}
		let Some(def) = registry.role(&role.name) else { continue };
		let wanted = resolve_permissions(&def.permissions, &perm_ids, "role", &role.name);
		let current = tx.list_role_permissions(role.role_id).await?;
		let (add, remove) = diff(&current, &wanted);
		if !add.is_empty() {
			tx.add_role_permissions(role.role_id, &add).await?;
			report.edges_added += add.len();
		}
		if !remove.is_empty() {
			tx.remove_role_permissions(role.role_id, &remove).await?;
			report.edges_removed += remove.len();
		}
	}

	let Some(super_admin) = roles.iter().find(|role| role.name.as_ref() == SUPER_ADMIN_ROLE) else {
		warn!("Role '{}' does not exist, super admin not synced", SUPER_ADMIN_ROLE);
		return Ok(());
	};
	let Some(&manage_id) = perm_ids.get(SYSTEM_MANAGE) else {
		warn!("Permission '{}' does not exist, super admin not synced", SYSTEM_MANAGE);
		return Ok(());
	};

	// Super admin holds exactly system.manage
	let current = tx.list_role_permissions(super_admin.role_id).await?;
	let (add, remove) = diff(&current, &[manage_id]);
	if !add.is_empty() {
		tx.add_role_permissions(super_admin.role_id, &add).await?;
		report.edges_added += add.len();
	}
	if !remove.is_empty() {
		tx.remove_role_permissions(super_admin.role_id, &remove).await?;
		report.edges_removed += remove.len();
	}

	if let Some(username) = admin_user {
		match tx.find_user(username).await? {
			Some(user_id) => {
				let current = tx.list_user_roles(user_id).await?;
				if !current.contains(&super_admin.role_id) {
					tx.add_user_roles(user_id, &[super_admin.role_id]).await?;
					info!(%user_id, username, "Granted super admin role");
					report.edges_added += 1;
				}
			}
			None => warn!(username, "Admin user does not exist, super admin role not granted"),
		}
	}
	Ok(())
}

// Menus //
//*******//
fn menu_changed(row: &MenuData, fields: &MenuFields<'_>) -> bool {
	row.label.as_deref() != fields.label
		|| row.path.as_deref() != fields.path
		|| row.icon.as_deref() != fields.icon
		|| row.parent_id != fields.parent_id
		|| row.mpath.as_ref() != fields.mpath
		|| row.custom_order != fields.custom_order
		|| row.systemd != fields.systemd
}

async fn sync_menus(
	tx: &mut dyn PermTx,
	registry: &FrozenPermissionRegistry,
	report: &mut SyncReport,
) -> ClResult<()> {
	let ordered =
		tree::order_by_parent(registry.menus(), "menu", |menu| menu.name.as_ref(), |menu| menu.parent.as_deref())?;
	let existing = tx.list_menus().await?;
	let by_name: HashMap<&str, &MenuData> =
		existing.iter().map(|row| (row.name.as_ref(), row)).collect();
	let mut placed: HashMap<&str, (RowId, String)> = HashMap::new();

	for def in ordered {
		let (parent_id, parent_mpath) = match def.parent.as_deref() {
			Some(parent) => {
				let (id, mpath) = placed.get(parent).ok_or_else(|| {
					Error::ConfigError(format!("menu parent '{}' not placed", parent))
				})?;
				(Some(*id), Some(mpath.clone()))
			}
			None => (None, None),
		};
		let mut fields = MenuFields {
			name: &def.name,
			label: def.label.as_deref(),
			path: def.path.as_deref(),
			icon: def.icon.as_deref(),
			parent_id,
			mpath: "",
			custom_order: def.custom_order.unwrap_or(0),
			systemd: true,
		};

		let (menu_id, mpath) = if let Some(row) = by_name.get(def.name.as_ref()) {
			let mpath = tree::child_mpath(parent_mpath.as_deref(), row.menu_id);
			fields.mpath = &mpath;
			if menu_changed(row, &fields) {
				tx.update_menu(row.menu_id, &fields).await?;
				report.menus.updated += 1;
			}
			(row.menu_id, mpath)
		} else {
			let menu_id = tx.create_menu(&fields).await?;
			let mpath = tree::child_mpath(parent_mpath.as_deref(), menu_id);
			fields.mpath = &mpath;
			tx.update_menu(menu_id, &fields).await?;
			debug!(menu_id, name = %def.name, "Menu created");
			report.menus.created += 1;
			(menu_id, mpath)
		};
		placed.insert(def.name.as_ref(), (menu_id, mpath));
	}

	for row in existing.iter().filter(|row| row.systemd && registry.menu(&row.name).is_none()) {
		tx.delete_menu(row.menu_id).await?;
		info!(name = %row.name, "Menu no longer registered, deleted");
		report.menus.deleted += 1;
	}

	let permissions = tx.list_permissions().await?;
	let perm_ids: HashMap<&str, RowId> =
		permissions.iter().map(|row| (row.name.as_ref(), row.perm_id)).collect();

	for def in registry.menus() {
		let Some((menu_id, _)) = placed.get(def.name.as_ref()) else { continue };
		let wanted = resolve_permissions(&def.permissions, &perm_ids, "menu", &def.name);
		let current = tx.list_menu_permissions(*menu_id).await?;
		let (add, remove) = diff(&current, &wanted);
		if !add.is_empty() {
			tx.add_menu_permissions(*menu_id, &add).await?;
			report.edges_added += add.len();
		}
		if !remove.is_empty() {
			tx.remove_menu_permissions(*menu_id, &remove).await?;
			report.edges_removed += remove.len();
		}
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_diff() {
		let (add, remove) = diff(&[1, 2, 3], &[3, 4, 4, 5]);
		assert_eq!(add, vec![4, 5]);
		assert_eq!(remove, vec![1, 2]);

		let (add, remove) = diff(&[7], &[7]);
		assert!(add.is_empty() && remove.is_empty());
	}
}

// vim: ts=4
