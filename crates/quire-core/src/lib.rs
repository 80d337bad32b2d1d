//! Authorization engine for the Quire platform.
//!
//! Feature modules declare roles, permissions and menus into a
//! [`registry::PermissionRegistry`] at boot. The registry is frozen, reconciled
//! into storage once by [`sync`], and then consulted per request by the
//! [`guard`], which builds an [`ability::Ability`] for the caller and runs the
//! route's [`checker::Checker`]s.

#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![forbid(unsafe_code)]

pub mod ability;
pub mod app;
pub mod checker;
pub mod core_perms;
pub mod extract;
pub mod guard;
pub mod menu;
pub mod prelude;
pub mod registry;
pub mod route_meta;
pub mod sync;
pub mod tree;

pub use ability::Ability;
pub use app::{App, AppBuilderOpts, AppState, BootMode, Extensions};
pub use checker::{CheckHandler, Checker};
pub use extract::{Auth, OptionalAuth};
pub use registry::{FrozenPermissionRegistry, PermissionRegistry};
pub use route_meta::{RouteId, RouteMetadata, RouteMetadataBuilder};

pub fn register_permissions(
	registry: &mut registry::PermissionRegistry,
) -> quire_types::error::ClResult<()> {
	core_perms::register_permissions(registry)
}

// vim: ts=4
