//! Permission adapter tests
//!
//! Exercises roles, permissions, menus, associations and principal loading
//! against a temporary database.

use quire_perm_adapter_sqlite::PermAdapterSqlite;
use quire_types::perm_adapter::{
	MenuFields, PermAdapter, PermissionFields, RoleFields, StoredRule,
};
use quire_types::prelude::*;
use tempfile::TempDir;

async fn create_test_adapter() -> (PermAdapterSqlite, TempDir) {
	let temp_dir = TempDir::new().expect("Failed to create temp directory");
	let adapter = PermAdapterSqlite::new(temp_dir.path()).await.expect("Failed to create adapter");
	(adapter, temp_dir)
}

fn rule(action: &str, subject: &str) -> StoredRule {
	StoredRule { action: action.into(), subject: vec![subject.into()] }
}

fn role<'a>(name: &'a str, systemd: bool) -> RoleFields<'a> {
	RoleFields { name, label: None, description: None, systemd }
}

fn perm<'a>(name: &'a str, rule: &'a StoredRule, parent_id: Option<i64>) -> PermissionFields<'a> {
	PermissionFields {
		name,
		label: None,
		description: None,
		rule,
		parent_id,
		mpath: "",
		custom_order: 0,
	}
}

#[tokio::test]
async fn test_role_create_list_delete() {
	let (adapter, _temp) = create_test_adapter().await;

	let mut tx = adapter.begin().await.expect("begin");
	let editor = tx.create_role(&role("editor", true)).await.expect("create editor");
	tx.create_role(&role("viewer", false)).await.expect("create viewer");
	tx.commit().await.expect("commit");

	let roles = adapter.list_roles().await.expect("list");
	assert_eq!(roles.len(), 2);
	assert_eq!(roles[0].name.as_ref(), "editor");
	assert!(roles[0].systemd);
	assert!(!roles[1].systemd);

	let mut tx = adapter.begin().await.expect("begin");
	tx.delete_role(editor).await.expect("delete");
	tx.commit().await.expect("commit");

	let roles = adapter.list_roles().await.expect("list");
	assert_eq!(roles.len(), 1);
	assert_eq!(roles[0].name.as_ref(), "viewer");
}

#[tokio::test]
async fn test_soft_deleted_role_is_restored_with_same_id() {
	let (adapter, _temp) = create_test_adapter().await;

	let mut tx = adapter.begin().await.expect("begin");
	let first = tx.create_role(&role("editor", true)).await.expect("create");
	tx.delete_role(first).await.expect("delete");
	let second = tx.create_role(&role("editor", true)).await.expect("recreate");
	tx.commit().await.expect("commit");

	assert_eq!(first, second);
	assert_eq!(adapter.list_roles().await.expect("list").len(), 1);
}

#[tokio::test]
async fn test_restored_role_starts_without_edges() {
	let (adapter, _temp) = create_test_adapter().await;
	let read = rule("read", "Comment");
	let user_id = adapter.create_user("alice").await.expect("user");

	let mut tx = adapter.begin().await.expect("begin");
	let role_id = tx.create_role(&role("editor", true)).await.expect("role");
	let p = tx.create_permission(&perm("comment.read", &read, None)).await.expect("perm");
	tx.add_role_permissions(role_id, &[p]).await.expect("edge");
	tx.add_user_roles(user_id, &[role_id]).await.expect("member");
	tx.delete_role(role_id).await.expect("delete");
	let restored = tx.create_role(&role("editor", true)).await.expect("recreate");

	assert_eq!(restored, role_id);
	assert!(tx.list_user_roles(user_id).await.expect("user roles").is_empty());
	assert!(tx.list_role_permissions(restored).await.expect("role permissions").is_empty());
	tx.commit().await.expect("commit");

	let principal = adapter.load_principal(user_id).await.expect("principal");
	assert!(!principal.has_role("editor"));
}

#[tokio::test]
async fn test_custom_role_name_conflict() {
	let (adapter, _temp) = create_test_adapter().await;

	let mut tx = adapter.begin().await.expect("begin");
	tx.create_role(&role("editor", true)).await.expect("editor");
	let retired = tx.create_role(&role("retired", true)).await.expect("retired");
	tx.delete_role(retired).await.expect("delete");
	tx.commit().await.expect("commit");

	let res = adapter.create_custom_role("editor", Some("Editor")).await;
	assert!(matches!(res, Err(Error::ValidationError(_))));
	let roles = adapter.list_roles().await.expect("list");
	let editor = roles.iter().find(|r| r.name.as_ref() == "editor").expect("editor");
	assert!(editor.systemd);

	// A soft-deleted name is free again
	let restored = adapter.create_custom_role("retired", None).await.expect("custom role");
	assert_eq!(restored, retired);
	let roles = adapter.list_roles().await.expect("list");
	assert!(roles.iter().any(|r| r.name.as_ref() == "retired" && !r.systemd));
}

#[tokio::test]
async fn test_dropped_transaction_rolls_back() {
	let (adapter, _temp) = create_test_adapter().await;

	{
		let mut tx = adapter.begin().await.expect("begin");
		tx.create_role(&role("editor", true)).await.expect("create");
	}

	assert!(adapter.list_roles().await.expect("list").is_empty());
}

#[tokio::test]
async fn test_permission_update_and_rule_roundtrip() {
	let (adapter, _temp) = create_test_adapter().await;
	let read = rule("read", "Comment");
	let update = rule("update", "Comment");

	let mut tx = adapter.begin().await.expect("begin");
	let parent = tx.create_permission(&perm("comment", &read, None)).await.expect("parent");
	let child = tx.create_permission(&perm("comment.update", &update, Some(parent))).await.expect("child");
	let mpath = format!("{}.{}.", parent, child);
	let mut fields = perm("comment.update", &update, Some(parent));
	fields.mpath = &mpath;
	tx.update_permission(child, &fields).await.expect("update");

	let perms = tx.list_permissions().await.expect("list");
	tx.commit().await.expect("commit");

	let child_row = perms.iter().find(|p| p.perm_id == child).expect("child row");
	assert_eq!(child_row.parent_id, Some(parent));
	assert_eq!(child_row.mpath.as_ref(), mpath);
	assert_eq!(child_row.rule, update);
}

#[tokio::test]
async fn test_update_missing_row_is_not_found() {
	let (adapter, _temp) = create_test_adapter().await;

	let mut tx = adapter.begin().await.expect("begin");
	let res = tx.update_role(42, &role("ghost", true)).await;
	assert!(matches!(res, Err(Error::NotFound)));
}

#[tokio::test]
async fn test_role_permission_edges() {
	let (adapter, _temp) = create_test_adapter().await;
	let read = rule("read", "Comment");

	let mut tx = adapter.begin().await.expect("begin");
	let role_id = tx.create_role(&role("editor", true)).await.expect("role");
	let a = tx.create_permission(&perm("a", &read, None)).await.expect("a");
	let b = tx.create_permission(&perm("b", &read, None)).await.expect("b");

	tx.add_role_permissions(role_id, &[a, b]).await.expect("add");
	// Duplicate edges are ignored
	tx.add_role_permissions(role_id, &[a]).await.expect("add again");
	assert_eq!(tx.list_role_permissions(role_id).await.expect("list"), vec![a, b]);

	tx.remove_role_permissions(role_id, &[a]).await.expect("remove");
	assert_eq!(tx.list_role_permissions(role_id).await.expect("list"), vec![b]);

	tx.delete_permission(b).await.expect("delete permission");
	assert!(tx.list_role_permissions(role_id).await.expect("list").is_empty());
	tx.commit().await.expect("commit");
}

#[tokio::test]
async fn test_menus_carry_permission_names() {
	let (adapter, _temp) = create_test_adapter().await;
	let read = rule("read", "Comment");

	let mut tx = adapter.begin().await.expect("begin");
	let p = tx.create_permission(&perm("comment.read", &read, None)).await.expect("perm");
	let menu = MenuFields {
		name: "comments",
		label: Some("Comments"),
		path: Some("/comments"),
		icon: None,
		parent_id: None,
		mpath: "",
		custom_order: 0,
		systemd: true,
	};
	let menu_id = tx.create_menu(&menu).await.expect("menu");
	tx.add_menu_permissions(menu_id, &[p]).await.expect("edge");
	tx.commit().await.expect("commit");

	let menus = adapter.list_menus().await.expect("list");
	assert_eq!(menus.len(), 1);
	assert_eq!(menus[0].path.as_deref(), Some("/comments"));
	assert_eq!(menus[0].permissions, vec![Box::<str>::from("comment.read")]);
}

#[tokio::test]
async fn test_load_principal() {
	let (adapter, _temp) = create_test_adapter().await;
	let read = rule("read", "Comment");
	let manage = rule("manage", "all");

	let mut tx = adapter.begin().await.expect("begin");
	let role_id = tx.create_role(&role("editor", true)).await.expect("role");
	let gone = tx.create_role(&role("retired", true)).await.expect("role");
	let p_read = tx.create_permission(&perm("comment.read", &read, None)).await.expect("perm");
	tx.create_permission(&perm("system.manage", &manage, None)).await.expect("perm");
	tx.add_role_permissions(role_id, &[p_read]).await.expect("edge");
	tx.commit().await.expect("commit");

	let user_id = adapter.create_user("alice").await.expect("user");
	adapter.grant_role(user_id, "editor").await.expect("grant role");
	adapter.grant_role(user_id, "retired").await.expect("grant role");
	adapter.grant_permission(user_id, "system.manage").await.expect("grant perm");

	let mut tx = adapter.begin().await.expect("begin");
	tx.delete_role(gone).await.expect("delete");
	tx.commit().await.expect("commit");

	let principal = adapter.load_principal(user_id).await.expect("principal");
	assert_eq!(principal.username.as_ref(), "alice");
	assert!(principal.has_role("editor"));
	assert!(!principal.has_role("retired"));
	assert_eq!(principal.roles[0].permissions.len(), 1);
	assert_eq!(principal.roles[0].permissions[0].rule, read);
	assert_eq!(principal.permissions.len(), 1);
	assert_eq!(principal.permissions[0].name.as_ref(), "system.manage");
}

#[tokio::test]
async fn test_user_admin() {
	let (adapter, _temp) = create_test_adapter().await;

	let user_id = adapter.create_user("bob").await.expect("create");
	assert_eq!(adapter.read_user_id("bob").await.expect("read"), user_id);
	assert!(matches!(adapter.read_user_id("nobody").await, Err(Error::NotFound)));
	assert!(matches!(adapter.create_user("bob").await, Err(Error::ValidationError(_))));
	assert!(matches!(adapter.grant_role(user_id, "missing").await, Err(Error::NotFound)));

	adapter.create_custom_role("moderator", Some("Moderator")).await.expect("custom role");
	let roles = adapter.list_roles().await.expect("list");
	assert!(roles.iter().any(|r| r.name.as_ref() == "moderator" && !r.systemd));
}

// vim: ts=4
