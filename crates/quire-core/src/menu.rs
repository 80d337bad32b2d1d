//! Menu visibility
//!
//! A menu is shown when the caller holds at least one of its permissions.
//! Menus without permissions are grouping nodes and are shown only when one
//! of their children is. Hiding a menu hides its whole subtree. Holders of
//! `system.manage` see everything.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use serde_with::skip_serializing_none;

use quire_types::perm_adapter::{MenuData, Principal};
use quire_types::types::RowId;

use crate::core_perms::SYSTEM_MANAGE;
use crate::prelude::*;

#[skip_serializing_none]
#[derive(Debug, Clone, Serialize)]
pub struct MenuNode {
	pub name: Box<str>,
	pub label: Option<Box<str>>,
	pub path: Option<Box<str>>,
	pub icon: Option<Box<str>>,
	#[serde(skip_serializing_if = "Vec::is_empty")]
	pub children: Vec<MenuNode>,
}

/// Names of all permissions a principal holds, directly or through roles
pub fn held_permissions(principal: &Principal) -> HashSet<&str> {
	principal
		.permissions
		.iter()
		.chain(principal.roles.iter().flat_map(|role| role.permissions.iter()))
		.map(|perm| perm.name.as_ref())
		.collect()
}

/// Builds the tree of menus visible to a holder of `held`. Siblings are
/// ordered by `custom_order`, then by id.
pub fn visible_tree(menus: &[MenuData], held: &HashSet<&str>) -> Vec<MenuNode> {
	let ids: HashSet<RowId> = menus.iter().map(|menu| menu.menu_id).collect();
	let mut children: HashMap<Option<RowId>, Vec<&MenuData>> = HashMap::new();
	for menu in menus {
		// Menus pointing at a missing parent are treated as roots
		let parent = menu.parent_id.filter(|id| ids.contains(id));
		children.entry(parent).or_default().push(menu);
	}
	for siblings in children.values_mut() {
		siblings.sort_by_key(|menu| (menu.custom_order, menu.menu_id));
	}

	let ctx = TreeCtx { children: &children, held, admin: held.contains(SYSTEM_MANAGE) };
	let mut visited = HashSet::new();
	ctx.build(None, &mut visited)
}

struct TreeCtx<'a> {
	children: &'a HashMap<Option<RowId>, Vec<&'a MenuData>>,
	held: &'a HashSet<&'a str>,
	admin: bool,
}

impl TreeCtx<'_> {
	fn build(&self, parent: Option<RowId>, visited: &mut HashSet<RowId>) -> Vec<MenuNode> {
		let Some(siblings) = self.children.get(&parent) else {
			return Vec::new();
		};

		let mut nodes = Vec::with_capacity(siblings.len());
		for menu in siblings {
			if !visited.insert(menu.menu_id) {
				continue;
			}
			let granted =
				self.admin || menu.permissions.iter().any(|perm| self.held.contains(perm.as_ref()));
			if !granted && !menu.permissions.is_empty() {
				continue;
			}
			let children = self.build(Some(menu.menu_id), visited);
			if !granted && children.is_empty() {
				continue;
			}
			nodes.push(MenuNode {
				name: menu.name.clone(),
				label: menu.label.clone(),
				path: menu.path.clone(),
				icon: menu.icon.clone(),
				children,
			});
		}
		nodes
	}
}

/// Loads the menus and returns the ones visible to `principal`
pub async fn menus_for(app: &App, principal: &Principal) -> ClResult<Vec<MenuNode>> {
	let menus = app.perm_adapter.list_menus().await?;
	Ok(visible_tree(&menus, &held_permissions(principal)))
}

#[cfg(test)]
mod tests {
	use super::*;

	fn menu(id: RowId, name: &str, parent: Option<RowId>, order: i64, perms: &[&str]) -> MenuData {
		MenuData {
			menu_id: id,
			name: name.into(),
			label: None,
			path: Some(format!("/{}", name).into()),
			icon: None,
			parent_id: parent,
			mpath: String::new().into(),
			custom_order: order,
			systemd: true,
			permissions: perms.iter().map(|p| Box::<str>::from(*p)).collect(),
		}
	}

	fn names(nodes: &[MenuNode]) -> Vec<&str> {
		nodes.iter().map(|node| node.name.as_ref()).collect()
	}

	fn fixture() -> Vec<MenuData> {
		vec![
			menu(1, "content", None, 0, &[]),
			menu(2, "comments", Some(1), 2, &["comment.create"]),
			menu(3, "moderation", Some(1), 1, &["comment.moderate"]),
			menu(4, "queue", Some(3), 0, &["comment.create"]),
			menu(5, "settings", None, 1, &["settings.read"]),
			menu(6, "empty", None, 2, &[]),
		]
	}

	#[test]
	fn test_group_shown_through_visible_child() {
		let held = HashSet::from(["comment.create"]);
		let tree = visible_tree(&fixture(), &held);

		assert_eq!(names(&tree), vec!["content"]);
		// "queue" is hidden along with its hidden parent
		assert_eq!(names(&tree[0].children), vec!["comments"]);
		assert!(tree[0].children[0].children.is_empty());
	}

	#[test]
	fn test_nothing_held() {
		assert!(visible_tree(&fixture(), &HashSet::new()).is_empty());
	}

	#[test]
	fn test_system_manage_sees_everything_in_order() {
		let held = HashSet::from([SYSTEM_MANAGE]);
		let tree = visible_tree(&fixture(), &held);

		assert_eq!(names(&tree), vec!["content", "settings", "empty"]);
		assert_eq!(names(&tree[0].children), vec!["moderation", "comments"]);
		assert_eq!(names(&tree[0].children[0].children), vec!["queue"]);
	}

	#[test]
	fn test_parent_cycle_terminates() {
		let menus = vec![menu(1, "a", Some(2), 0, &["p"]), menu(2, "b", Some(1), 0, &["p"])];
		// Neither is reachable from a root
		assert!(visible_tree(&menus, &HashSet::from(["p"])).is_empty());
	}
}

// vim: ts=4
