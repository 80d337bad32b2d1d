//! Permissions owned by the engine itself
//!
//! `system.manage` grants everything and is held by the `super-admin` role.
//! Sync never deletes it, even when no module registers it.

use crate::ability::{ALL, MANAGE};
use crate::prelude::*;
use crate::registry::{PermissionDef, PermissionRegistry, RoleDef};

pub const SYSTEM_MANAGE: &str = "system.manage";
pub const SUPER_ADMIN_ROLE: &str = "super-admin";

/// Register the core permission and role
pub fn register_permissions(registry: &mut PermissionRegistry) -> ClResult<()> {
	registry.add_permissions([PermissionDef::new(SYSTEM_MANAGE, MANAGE, ALL)
		.label("Manage system")
		.description("Unrestricted access to every resource")
		.order(0)]);

	registry.add_roles([RoleDef::new(SUPER_ADMIN_ROLE)
		.label("Super administrator")
		.permissions([SYSTEM_MANAGE])]);

	Ok(())
}

// vim: ts=4
