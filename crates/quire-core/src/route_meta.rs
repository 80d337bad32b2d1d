//! Route authorization metadata
//!
//! Routes are identified by a [`RouteId`] of controller and handler name.
//! Checkers and the guest marker can be declared for a whole controller or
//! for a single handler; handler-level metadata takes precedence.

use std::collections::HashMap;

use crate::checker::Checker;
use crate::prelude::*;
use crate::registry::FrozenPermissionRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RouteId {
	pub controller: &'static str,
	pub handler: &'static str,
}

impl RouteId {
	pub const fn new(controller: &'static str, handler: &'static str) -> Self {
		Self { controller, handler }
	}
}

impl std::fmt::Display for RouteId {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}::{}", self.controller, self.handler)
	}
}

#[derive(Debug, Clone, Default)]
struct RouteMeta {
	checkers: Option<Vec<Checker>>,
	/// Permission names the checkers were derived from, validated on freeze
	permissions: Vec<Box<str>>,
	guest: Option<bool>,
}

impl RouteMeta {
	fn push_checkers(&mut self, checkers: impl IntoIterator<Item = Checker>) {
		self.checkers.get_or_insert_with(Vec::new).extend(checkers);
	}

	fn push_permissions(&mut self, names: &[&str]) {
		self.push_checkers(names.iter().map(|name| Checker::permission(*name)));
		self.permissions.extend(names.iter().map(|name| Box::<str>::from(*name)));
	}
}

/// Collects route metadata while routes are registered
#[derive(Debug, Default)]
pub struct RouteMetadataBuilder {
	controllers: HashMap<&'static str, RouteMeta>,
	handlers: HashMap<RouteId, RouteMeta>,
}

impl RouteMetadataBuilder {
	pub fn new() -> Self {
		Self::default()
	}

	/// Default checkers for every handler of a controller
	pub fn controller_checkers(
		&mut self,
		controller: &'static str,
		checkers: impl IntoIterator<Item = Checker>,
	) -> &mut Self {
		self.controllers.entry(controller).or_default().push_checkers(checkers);
		self
	}

	pub fn controller_guest(&mut self, controller: &'static str, guest: bool) -> &mut Self {
		self.controllers.entry(controller).or_default().guest = Some(guest);
		self
	}

	pub fn checkers(
		&mut self,
		route: RouteId,
		checkers: impl IntoIterator<Item = Checker>,
	) -> &mut Self {
		self.handlers.entry(route).or_default().push_checkers(checkers);
		self
	}

	/// Derives one checker per permission name
	pub fn permissions(&mut self, route: RouteId, names: &[&str]) -> &mut Self {
		self.handlers.entry(route).or_default().push_permissions(names);
		self
	}

	pub fn guest(&mut self, route: RouteId) -> &mut Self {
		self.handlers.entry(route).or_default().guest = Some(true);
		self
	}

	/// Freezes the metadata. Permission names that the registry does not know
	/// are reported; their checkers deny at request time.
	pub fn freeze(self, registry: &FrozenPermissionRegistry) -> RouteMetadata {
		for (route, meta) in &self.handlers {
			for name in &meta.permissions {
				if registry.permission(name).is_none() {
					warn!("route {} requires unknown permission '{}'", route, name);
				}
			}
		}

		RouteMetadata { controllers: self.controllers, handlers: self.handlers }
	}
}

/// Read-only route metadata stored in `AppState`
#[derive(Debug, Default)]
pub struct RouteMetadata {
	controllers: HashMap<&'static str, RouteMeta>,
	handlers: HashMap<RouteId, RouteMeta>,
}

impl RouteMetadata {
	/// Checkers of a route: the handler's list if it declares one, else the
	/// controller's
	pub fn checkers(&self, route: RouteId) -> &[Checker] {
		self.handlers
			.get(&route)
			.and_then(|meta| meta.checkers.as_deref())
			.or_else(|| {
				self.controllers.get(route.controller).and_then(|meta| meta.checkers.as_deref())
			})
			.unwrap_or_default()
	}

	pub fn is_guest(&self, route: RouteId) -> bool {
		self.handlers
			.get(&route)
			.and_then(|meta| meta.guest)
			.or_else(|| self.controllers.get(route.controller).and_then(|meta| meta.guest))
			.unwrap_or(false)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::registry::PermissionRegistry;

	const LIST: RouteId = RouteId::new("post", "list");
	const UPDATE: RouteId = RouteId::new("post", "update");
	const CREATE: RouteId = RouteId::new("post", "create");

	fn allow() -> Checker {
		Checker::from_fn(|_, _, _| Box::pin(async { Ok::<_, Error>(true) }))
	}

	#[test]
	fn test_handler_overrides_controller() {
		let mut builder = RouteMetadataBuilder::new();
		builder
			.controller_checkers("post", [allow(), allow()])
			.checkers(UPDATE, [allow()])
			.controller_guest("post", true)
			.guest(LIST);
		let meta = builder.freeze(&PermissionRegistry::new().freeze());

		assert_eq!(meta.checkers(UPDATE).len(), 1);
		assert_eq!(meta.checkers(CREATE).len(), 2);
		assert!(meta.is_guest(LIST));
		assert!(meta.is_guest(CREATE));
	}

	#[test]
	fn test_handler_can_opt_out_of_guest() {
		let mut builder = RouteMetadataBuilder::new();
		builder.controller_guest("post", true);
		builder.handlers.entry(UPDATE).or_default().guest = Some(false);
		let meta = builder.freeze(&PermissionRegistry::new().freeze());

		assert!(!meta.is_guest(UPDATE));
		assert!(meta.is_guest(LIST));
	}

	#[test]
	fn test_unknown_route_has_no_metadata() {
		let meta = RouteMetadataBuilder::new().freeze(&PermissionRegistry::new().freeze());
		assert!(meta.checkers(LIST).is_empty());
		assert!(!meta.is_guest(LIST));
	}

	#[test]
	fn test_permissions_derive_checkers() {
		let mut builder = RouteMetadataBuilder::new();
		builder.permissions(CREATE, &["post.create", "post.publish"]);
		let meta = builder.freeze(&PermissionRegistry::new().freeze());

		assert_eq!(meta.checkers(CREATE).len(), 2);
		assert!(matches!(meta.checkers(CREATE)[0], Checker::Handler(_)));
	}
}

// vim: ts=4
