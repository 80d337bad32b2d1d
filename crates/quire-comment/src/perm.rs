//! Comment permissions, roles and menus

use serde_json::json;

use quire_core::ability::MANAGE;
use quire_core::registry::{MenuDef, PermissionDef, PermissionRegistry, RoleDef};

use crate::prelude::*;
use crate::store::Comment;

pub const COMMENT_READ: &str = "comment";
pub const COMMENT_CREATE: &str = "comment.create";
pub const COMMENT_OWNER: &str = "comment.owner";
pub const COMMENT_DELETE_OWN: &str = "comment.delete.own";
pub const COMMENT_MODERATE: &str = "comment.moderate";

pub const CUSTOM_USER_ROLE: &str = "custom-user";
pub const MODERATOR_ROLE: &str = "comment-moderator";

/// Register the comment permissions, roles and menus
pub fn register_permissions(registry: &mut PermissionRegistry) -> ClResult<()> {
	registry.add_permissions([
		PermissionDef::new(COMMENT_READ, "read", "Comment").label("Comments").order(10),
		PermissionDef::action(COMMENT_CREATE, "create")
			.subject_type::<Comment>()
			.label("Write comments")
			.parent(COMMENT_READ)
			.order(1),
		PermissionDef::action(COMMENT_OWNER, "update")
			.subject_type::<Comment>()
			.label("Edit own comments")
			.parent(COMMENT_READ)
			.order(2)
			.conditions(|p| Ok(json!({ "author.id": p.id }))),
		PermissionDef::action(COMMENT_DELETE_OWN, "delete")
			.subject_type::<Comment>()
			.label("Delete own comments")
			.parent(COMMENT_READ)
			.order(3)
			.conditions(|p| Ok(json!({ "author.id": p.id }))),
		PermissionDef::action(COMMENT_MODERATE, MANAGE)
			.subject_type::<Comment>()
			.label("Moderate comments")
			.description("Edit and delete any comment")
			.parent(COMMENT_READ)
			.order(4),
	]);

	registry.add_roles([
		RoleDef::new(CUSTOM_USER_ROLE).label("User").permissions([
			COMMENT_CREATE,
			COMMENT_OWNER,
			COMMENT_DELETE_OWN,
		]),
		RoleDef::new(MODERATOR_ROLE)
			.label("Comment moderator")
			.permissions([COMMENT_CREATE, COMMENT_MODERATE]),
	]);

	registry.add_menus([
		MenuDef::new("community").label("Community").icon("users").order(20),
		MenuDef::new("comments")
			.label("Comments")
			.path("/comments")
			.parent("community")
			.order(1)
			.permissions([COMMENT_CREATE]),
		MenuDef::new("comment-moderation")
			.label("Moderation")
			.path("/comments/moderation")
			.parent("community")
			.order(2)
			.permissions([COMMENT_MODERATE]),
	]);

	Ok(())
}


// vim: ts=4
