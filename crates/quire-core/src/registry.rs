//! Declarative catalogue of roles, permissions and menus
//!
//! Every feature module contributes its definitions through a
//! `register_permissions(&mut PermissionRegistry)` function during boot.
//! Definitions with the same name are merged field by field: a later
//! non-empty field wins and name lists are unioned in first-seen order.
//! Once every module has registered, [`PermissionRegistry::freeze`] produces
//! the read-only [`FrozenPermissionRegistry`] that the sync engine and the
//! ability builder share.

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

use quire_types::perm_adapter::{Principal, StoredRule};

use crate::prelude::*;

/// Produces the condition object of a rule for a given principal,
/// e.g. `{"author.id": 42}`
pub type ConditionsFn = Arc<dyn Fn(&Principal) -> ClResult<serde_json::Value> + Send + Sync>;

/// Stable subject name for a Rust type: the last path segment of its type name
pub fn subject_name<T: ?Sized>() -> &'static str {
	normalize_subject(std::any::type_name::<T>())
}

/// Strips module paths and generic arguments from a type reference.
/// Plain names pass through unchanged.
pub fn normalize_subject(subject: &str) -> &str {
	let base = subject.split('<').next().unwrap_or(subject);
	base.rsplit("::").next().unwrap_or(base)
}

fn merge_str(target: &mut Box<str>, value: Box<str>) {
	if !value.is_empty() {
		*target = value;
	}
}

fn merge_opt(target: &mut Option<Box<str>>, value: Option<Box<str>>) {
	if let Some(value) = value.filter(|v| !v.is_empty()) {
		*target = Some(value);
	}
}

fn merge_list(target: &mut Vec<Box<str>>, values: Vec<Box<str>>) {
	for value in values {
		if !target.contains(&value) {
			target.push(value);
		}
	}
}

// RoleDef //
//*********//
#[derive(Debug, Clone, Default)]
pub struct RoleDef {
	pub name: Box<str>,
	pub label: Option<Box<str>>,
	pub description: Option<Box<str>>,
	/// Names of the permissions this role grants
	pub permissions: Vec<Box<str>>,
}

impl RoleDef {
	pub fn new(name: impl Into<Box<str>>) -> Self {
		Self { name: name.into(), ..Self::default() }
	}

	pub fn label(mut self, label: impl Into<Box<str>>) -> Self {
		self.label = Some(label.into());
		self
	}

	pub fn description(mut self, description: impl Into<Box<str>>) -> Self {
		self.description = Some(description.into());
		self
	}

	pub fn permissions<I, S>(mut self, names: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<Box<str>>,
	{
		merge_list(&mut self.permissions, names.into_iter().map(Into::into).collect());
		self
	}

	fn merge(&mut self, other: RoleDef) {
		merge_opt(&mut self.label, other.label);
		merge_opt(&mut self.description, other.description);
		merge_list(&mut self.permissions, other.permissions);
	}
}

// PermissionDef //
//***************//
#[derive(Clone, Default)]
pub struct PermissionDef {
	pub name: Box<str>,
	pub label: Option<Box<str>>,
	pub description: Option<Box<str>>,
	pub action: Box<str>,
	pub subject: Vec<Box<str>>,
	pub conditions: Option<ConditionsFn>,
	/// Name of the parent permission
	pub parent: Option<Box<str>>,
	pub custom_order: Option<i64>,
}

impl Debug for PermissionDef {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("PermissionDef")
			.field("name", &self.name)
			.field("action", &self.action)
			.field("subject", &self.subject)
			.field("conditions", &self.conditions.is_some())
			.field("parent", &self.parent)
			.field("custom_order", &self.custom_order)
			.finish_non_exhaustive()
	}
}

impl PermissionDef {
	pub fn new(
		name: impl Into<Box<str>>,
		action: impl Into<Box<str>>,
		subject: impl Into<Box<str>>,
	) -> Self {
		Self {
			name: name.into(),
			action: action.into(),
			subject: vec![subject.into()],
			..Self::default()
		}
	}

	/// Permission without a subject yet, to be completed with
	/// [`subject`](Self::subject) or [`subject_type`](Self::subject_type)
	pub fn action(name: impl Into<Box<str>>, action: impl Into<Box<str>>) -> Self {
		Self { name: name.into(), action: action.into(), ..Self::default() }
	}

	pub fn label(mut self, label: impl Into<Box<str>>) -> Self {
		self.label = Some(label.into());
		self
	}

	pub fn description(mut self, description: impl Into<Box<str>>) -> Self {
		self.description = Some(description.into());
		self
	}

	pub fn subject(mut self, subject: impl Into<Box<str>>) -> Self {
		merge_list(&mut self.subject, vec![subject.into()]);
		self
	}

	/// Adds a subject given as a Rust type. The full type path is kept until
	/// registration, where it is normalized to the type's name.
	pub fn subject_type<T: ?Sized>(self) -> Self {
		self.subject(std::any::type_name::<T>())
	}

	pub fn conditions<F>(mut self, f: F) -> Self
	where
		F: Fn(&Principal) -> ClResult<serde_json::Value> + Send + Sync + 'static,
	{
		self.conditions = Some(Arc::new(f));
		self
	}

	pub fn parent(mut self, parent: impl Into<Box<str>>) -> Self {
		self.parent = Some(parent.into());
		self
	}

	pub fn order(mut self, order: i64) -> Self {
		self.custom_order = Some(order);
		self
	}

	/// The persisted part of the rule. Conditions never leave the process.
	pub fn stored_rule(&self) -> StoredRule {
		StoredRule { action: self.action.clone(), subject: self.subject.clone() }
	}

	fn normalize(&mut self) {
		let subjects = std::mem::take(&mut self.subject);
		merge_list(
			&mut self.subject,
			subjects.iter().map(|s| Box::<str>::from(normalize_subject(s))).collect(),
		);
	}

	fn merge(&mut self, other: PermissionDef) {
		merge_opt(&mut self.label, other.label);
		merge_opt(&mut self.description, other.description);
		merge_str(&mut self.action, other.action);
		merge_list(&mut self.subject, other.subject);
		if other.conditions.is_some() {
			self.conditions = other.conditions;
		}
		merge_opt(&mut self.parent, other.parent);
		if other.custom_order.is_some() {
			self.custom_order = other.custom_order;
		}
	}
}

// MenuDef //
//*********//
#[derive(Debug, Clone, Default)]
pub struct MenuDef {
	pub name: Box<str>,
	pub label: Option<Box<str>>,
	pub path: Option<Box<str>>,
	pub icon: Option<Box<str>>,
	pub parent: Option<Box<str>>,
	pub custom_order: Option<i64>,
	/// Names of the permissions that make this menu visible
	pub permissions: Vec<Box<str>>,
}

impl MenuDef {
	pub fn new(name: impl Into<Box<str>>) -> Self {
		Self { name: name.into(), ..Self::default() }
	}

	pub fn label(mut self, label: impl Into<Box<str>>) -> Self {
		self.label = Some(label.into());
		self
	}

	pub fn path(mut self, path: impl Into<Box<str>>) -> Self {
		self.path = Some(path.into());
		self
	}

	pub fn icon(mut self, icon: impl Into<Box<str>>) -> Self {
		self.icon = Some(icon.into());
		self
	}

	pub fn parent(mut self, parent: impl Into<Box<str>>) -> Self {
		self.parent = Some(parent.into());
		self
	}

	pub fn order(mut self, order: i64) -> Self {
		self.custom_order = Some(order);
		self
	}

	pub fn permissions<I, S>(mut self, names: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<Box<str>>,
	{
		merge_list(&mut self.permissions, names.into_iter().map(Into::into).collect());
		self
	}

	fn merge(&mut self, other: MenuDef) {
		merge_opt(&mut self.label, other.label);
		merge_opt(&mut self.path, other.path);
		merge_opt(&mut self.icon, other.icon);
		merge_opt(&mut self.parent, other.parent);
		if other.custom_order.is_some() {
			self.custom_order = other.custom_order;
		}
		merge_list(&mut self.permissions, other.permissions);
	}
}

/// Insertion-ordered list of definitions with merge-by-name
#[derive(Debug)]
struct Catalogue<T> {
	items: Vec<T>,
	index: HashMap<Box<str>, usize>,
}

impl<T> Catalogue<T> {
	fn new() -> Self {
		Self { items: Vec::new(), index: HashMap::new() }
	}

	fn add(&mut self, name: &str, item: T, merge: impl FnOnce(&mut T, T)) {
		if let Some(&idx) = self.index.get(name) {
			if let Some(existing) = self.items.get_mut(idx) {
				merge(existing, item);
			}
		} else {
			self.index.insert(name.into(), self.items.len());
			self.items.push(item);
		}
	}

	fn get(&self, name: &str) -> Option<&T> {
		self.index.get(name).and_then(|&idx| self.items.get(idx))
	}
}

// PermissionRegistry //
//********************//
/// Mutable registry used during app initialization
#[derive(Debug)]
pub struct PermissionRegistry {
	roles: Catalogue<RoleDef>,
	permissions: Catalogue<PermissionDef>,
	menus: Catalogue<MenuDef>,
}

impl PermissionRegistry {
	pub fn new() -> Self {
		Self { roles: Catalogue::new(), permissions: Catalogue::new(), menus: Catalogue::new() }
	}

	pub fn add_roles(&mut self, roles: impl IntoIterator<Item = RoleDef>) {
		for role in roles {
			debug!("Registering role: {}", role.name);
			let name = role.name.clone();
			self.roles.add(&name, role, RoleDef::merge);
		}
	}

	pub fn add_permissions(&mut self, permissions: impl IntoIterator<Item = PermissionDef>) {
		for mut perm in permissions {
			debug!("Registering permission: {}", perm.name);
			perm.normalize();
			let name = perm.name.clone();
			self.permissions.add(&name, perm, PermissionDef::merge);
		}
	}

	pub fn add_menus(&mut self, menus: impl IntoIterator<Item = MenuDef>) {
		for menu in menus {
			debug!("Registering menu: {}", menu.name);
			let name = menu.name.clone();
			self.menus.add(&name, menu, MenuDef::merge);
		}
	}

	pub fn roles(&self) -> &[RoleDef] {
		&self.roles.items
	}

	pub fn permissions(&self) -> &[PermissionDef] {
		&self.permissions.items
	}

	pub fn menus(&self) -> &[MenuDef] {
		&self.menus.items
	}

	/// Freeze the registry (make it immutable)
	pub fn freeze(self) -> FrozenPermissionRegistry {
		info!(
			"Freezing permission registry with {} roles, {} permissions, {} menus",
			self.roles.items.len(),
			self.permissions.items.len(),
			self.menus.items.len()
		);
		FrozenPermissionRegistry {
			roles: self.roles,
			permissions: self.permissions,
			menus: self.menus,
		}
	}
}

impl Default for PermissionRegistry {
	fn default() -> Self {
		Self::new()
	}
}

// FrozenPermissionRegistry //
//**************************//
/// Immutable registry shared through `AppState`
#[derive(Debug)]
pub struct FrozenPermissionRegistry {
	roles: Catalogue<RoleDef>,
	permissions: Catalogue<PermissionDef>,
	menus: Catalogue<MenuDef>,
}

impl FrozenPermissionRegistry {
	pub fn roles(&self) -> &[RoleDef] {
		&self.roles.items
	}

	pub fn permissions(&self) -> &[PermissionDef] {
		&self.permissions.items
	}

	pub fn menus(&self) -> &[MenuDef] {
		&self.menus.items
	}

	pub fn role(&self, name: &str) -> Option<&RoleDef> {
		self.roles.get(name)
	}

	pub fn permission(&self, name: &str) -> Option<&PermissionDef> {
		self.permissions.get(name)
	}

	pub fn menu(&self, name: &str) -> Option<&MenuDef> {
		self.menus.get(name)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	struct Post;

	#[test]
	fn test_same_name_definitions_are_merged() {
		let mut registry = PermissionRegistry::new();
		registry.add_roles([RoleDef::new("editor").label("Editor").permissions(["post.read"])]);
		registry.add_roles([RoleDef::new("editor").permissions(["post.update", "post.read"])]);
		registry.add_roles([RoleDef::new("viewer")]);

		let roles = registry.roles();
		assert_eq!(roles.len(), 2);
		assert_eq!(roles[0].name.as_ref(), "editor");
		assert_eq!(roles[0].label.as_deref(), Some("Editor"));
		assert_eq!(roles[0].permissions, vec![Box::<str>::from("post.read"), Box::<str>::from("post.update")]);
	}

	#[test]
	fn test_later_non_empty_fields_win() {
		let mut registry = PermissionRegistry::new();
		registry.add_permissions([PermissionDef::new("post.read", "read", "Post").label("Read")]);
		registry.add_permissions([PermissionDef::new("post.read", "", "Article")
			.label("")
			.description("Read posts")
			.order(3)]);

		let perm = &registry.permissions()[0];
		assert_eq!(perm.action.as_ref(), "read");
		assert_eq!(perm.label.as_deref(), Some("Read"));
		assert_eq!(perm.description.as_deref(), Some("Read posts"));
		assert_eq!(perm.subject, vec![Box::<str>::from("Post"), Box::<str>::from("Article")]);
		assert_eq!(perm.custom_order, Some(3));
	}

	#[test]
	fn test_subject_types_are_normalized() {
		let mut registry = PermissionRegistry::new();
		registry.add_permissions([PermissionDef::action("post.update", "update")
			.subject_type::<Post>()
			.subject("Post")
			.subject("blog::Post")
			.subject("Comment")]);

		let perm = &registry.permissions()[0];
		assert_eq!(perm.subject, vec![Box::<str>::from("Post"), Box::<str>::from("Comment")]);
		assert_eq!(subject_name::<Post>(), "Post");
	}

	#[test]
	fn test_stored_rule_drops_conditions() {
		let def = PermissionDef::new("post.owner", "update", "Post")
			.conditions(|p| Ok(serde_json::json!({ "author.id": p.id })));

		let stored = def.stored_rule();
		assert_eq!(stored.action.as_ref(), "update");
		assert_eq!(stored.subject, vec![Box::<str>::from("Post")]);
		assert!(def.conditions.is_some());
	}

	#[test]
	fn test_frozen_lookup_keeps_registration_order() {
		let mut registry = PermissionRegistry::new();
		registry.add_menus([MenuDef::new("content"), MenuDef::new("settings")]);
		registry.add_menus([MenuDef::new("content").path("/content")]);
		let frozen = registry.freeze();

		let names: Vec<&str> = frozen.menus().iter().map(|m| m.name.as_ref()).collect();
		assert_eq!(names, vec!["content", "settings"]);
		assert_eq!(frozen.menu("content").and_then(|m| m.path.as_deref()), Some("/content"));
		assert!(frozen.permission("missing").is_none());
	}
}

// vim: ts=4
