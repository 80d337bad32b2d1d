//! App builder - constructs and runs the Quire application

use std::sync::Arc;
use std::time::Duration;

use axum::Router;

use crate::auth_adapter::AuthAdapter;
use crate::perm_adapter::PermAdapter;
use crate::prelude::*;
use crate::routes;
pub use quire_core::app::{
	App, AppBuilderOpts, AppState, BootMode, DEFAULT_CHECKER_TIMEOUT, VERSION,
};
use quire_core::guard::message::MessageRouterBuilder;
use quire_core::registry::PermissionRegistry;
use quire_core::{Extensions, RouteMetadataBuilder, sync};

/// Registration hook for permissions declared outside the bundled modules
type RegisterCallback = Box<dyn FnOnce(&mut PermissionRegistry) -> ClResult<()> + Send>;

pub struct AppBuilder {
	opts: AppBuilderOpts,
	auth_adapter: Option<Arc<dyn AuthAdapter>>,
	perm_adapter: Option<Arc<dyn PermAdapter>>,
	register: Vec<RegisterCallback>,
}

impl AppBuilder {
	pub fn new() -> Self {
		// Embedders and tests may have installed a subscriber already
		let _ = tracing_subscriber::fmt()
			.with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
			.with_target(false)
			.try_init();
		AppBuilder {
			opts: AppBuilderOpts {
				mode: BootMode::Serve,
				listen: "127.0.0.1:8080".into(),
				admin_user: None,
				checker_timeout: DEFAULT_CHECKER_TIMEOUT,
			},
			auth_adapter: None,
			perm_adapter: None,
			register: Vec::new(),
		}
	}

	// Opts
	pub fn mode(&mut self, mode: BootMode) -> &mut Self {
		self.opts.mode = mode;
		self
	}
	pub fn listen(&mut self, listen: impl Into<Box<str>>) -> &mut Self {
		self.opts.listen = listen.into();
		self
	}
	pub fn admin_user(&mut self, admin_user: impl Into<Box<str>>) -> &mut Self {
		self.opts.admin_user = Some(admin_user.into());
		self
	}
	pub fn checker_timeout(&mut self, timeout: Duration) -> &mut Self {
		self.opts.checker_timeout = timeout;
		self
	}

	// Adapters
	pub fn auth_adapter(&mut self, auth_adapter: Arc<dyn AuthAdapter>) -> &mut Self {
		self.auth_adapter = Some(auth_adapter);
		self
	}
	pub fn perm_adapter(&mut self, perm_adapter: Arc<dyn PermAdapter>) -> &mut Self {
		self.perm_adapter = Some(perm_adapter);
		self
	}

	/// Adds a hook that declares extra roles, permissions or menus. Hooks run
	/// after the bundled modules, so their fields win on merge.
	pub fn register_permissions<F>(&mut self, f: F) -> &mut Self
	where
		F: FnOnce(&mut PermissionRegistry) -> ClResult<()> + Send + 'static,
	{
		self.register.push(Box::new(f));
		self
	}

	/// Builds the application state and its router without binding a socket
	pub async fn build(self) -> ClResult<(App, Router)> {
		let Some(auth_adapter) = self.auth_adapter else {
			error!("FATAL: No auth adapter configured");
			return Err(Error::ConfigError("no auth adapter configured".into()));
		};
		let Some(perm_adapter) = self.perm_adapter else {
			error!("FATAL: No perm adapter configured");
			return Err(Error::ConfigError("no perm adapter configured".into()));
		};

		// Permission registry
		let mut registry = PermissionRegistry::new();
		quire_core::register_permissions(&mut registry)?;
		quire_comment::register_permissions(&mut registry)?;
		for register in self.register {
			register(&mut registry)?;
		}
		let registry = registry.freeze();

		if self.opts.mode == BootMode::Serve {
			sync::sync(perm_adapter.as_ref(), &registry, self.opts.admin_user.as_deref())
				.await
				.inspect_err(|err| error!("FATAL: Permission sync failed: {}", err))?;
		}

		// Route metadata and message events
		let mut route_meta = RouteMetadataBuilder::new();
		routes::register_routes(&mut route_meta);
		quire_comment::register_routes(&mut route_meta);
		let route_meta = route_meta.freeze(&registry);

		let mut messages = MessageRouterBuilder::new();
		quire_comment::register_messages(&mut messages);

		let mut extensions = Extensions::new();
		quire_comment::init_extensions(&mut extensions);

		let app: App = Arc::new(AppState {
			opts: self.opts,
			auth_adapter,
			perm_adapter,
			perm_registry: Arc::new(registry),
			routes: route_meta,
			messages: messages.build(),
			extensions,
		});
		let router = routes::init(&app);

		Ok((app, router))
	}

	pub async fn run(self) -> ClResult<()> {
		info!("Quire V{}", VERSION);

		let (app, router) = self.build().await?;
		if app.opts.mode == BootMode::Command {
			debug!("Command mode, not serving");
			return Ok(());
		}

		let listener = tokio::net::TcpListener::bind(app.opts.listen.as_ref()).await.inspect_err(
			|err| error!("FATAL: Cannot listen on {}: {}", app.opts.listen, err),
		)?;
		info!("Listening on {}", app.opts.listen);
		axum::serve(listener, router).await?;

		Ok(())
	}
}

impl Default for AppBuilder {
	fn default() -> Self {
		Self::new()
	}
}

// vim: ts=4
