//! App state type

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use quire_types::auth_adapter::AuthAdapter;
use quire_types::perm_adapter::PermAdapter;

use crate::guard::message::MessageRouter;
use crate::prelude::*;
use crate::registry::FrozenPermissionRegistry;
use crate::route_meta::RouteMetadata;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub const DEFAULT_CHECKER_TIMEOUT: Duration = Duration::from_secs(5);

/// Whether the process is a long-running server or a one-off command.
/// Only `Serve` reconciles the registry into storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootMode {
	Serve,
	Command,
}

#[derive(Debug, Clone)]
pub struct AppBuilderOpts {
	pub mode: BootMode,
	pub listen: Box<str>,
	/// Username that is granted the super-admin role during sync
	pub admin_user: Option<Box<str>>,
	/// Upper bound for a single route checker
	pub checker_timeout: Duration,
}

pub struct AppState {
	pub opts: AppBuilderOpts,

	pub auth_adapter: Arc<dyn AuthAdapter>,
	pub perm_adapter: Arc<dyn PermAdapter>,

	pub perm_registry: Arc<FrozenPermissionRegistry>,
	pub routes: RouteMetadata,
	pub messages: MessageRouter,

	// Type-erased extension map for feature-specific state
	pub extensions: Extensions,
}

impl AppState {
	/// Get a registered extension by type. Returns error if not found.
	pub fn ext<T: Send + Sync + 'static>(&self) -> ClResult<&T> {
		self.extensions.get::<T>().ok_or_else(|| {
			Error::Internal(format!("Extension {} not registered", std::any::type_name::<T>()))
		})
	}
}

pub type App = Arc<AppState>;

/// Feature modules keep their own state here (e.g. a comment store) so that
/// `AppState` does not depend on feature crates
#[derive(Default)]
pub struct Extensions {
	map: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl Extensions {
	pub fn new() -> Self {
		Self::default()
	}

	/// Inserts a value, replacing a previous value of the same type
	pub fn insert<T: Send + Sync + 'static>(&mut self, val: T) -> &mut Self {
		self.map.insert(TypeId::of::<T>(), Box::new(val));
		self
	}

	pub fn get<T: Send + Sync + 'static>(&self) -> Option<&T> {
		self.map.get(&TypeId::of::<T>())?.downcast_ref::<T>()
	}

	pub fn contains<T: Send + Sync + 'static>(&self) -> bool {
		self.map.contains_key(&TypeId::of::<T>())
	}
}


// vim: ts=4
