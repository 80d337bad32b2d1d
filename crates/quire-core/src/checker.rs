//! Route checkers
//!
//! A checker is an authorization predicate attached to a route. It gets the
//! caller's ability, the app and a transport-independent view of the request,
//! and answers allow or deny. Checkers come in two forms, a function and a
//! [`CheckHandler`] object; [`Checker::check`] dispatches both.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;

use crate::ability::Ability;
use crate::guard::GuardRequest;
use crate::prelude::*;

pub type CheckFuture<'a> = BoxFuture<'a, ClResult<bool>>;

/// Function-form checker
pub type CheckFn = Arc<
	dyn for<'a> Fn(&'a Ability, &'a App, &'a GuardRequest) -> CheckFuture<'a> + Send + Sync,
>;

/// Object-form checker. Implementors typically pull collaborators from
/// `app.ext::<T>()` at evaluation time.
#[async_trait]
pub trait CheckHandler: Send + Sync {
	async fn handle(&self, ability: &Ability, app: &App, req: &GuardRequest) -> ClResult<bool>;
}

#[derive(Clone)]
pub enum Checker {
	Fn(CheckFn),
	Handler(Arc<dyn CheckHandler>),
}

impl std::fmt::Debug for Checker {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Checker::Fn(_) => f.write_str("Checker::Fn"),
			Checker::Handler(_) => f.write_str("Checker::Handler"),
		}
	}
}

impl Checker {
	pub fn from_fn<F>(f: F) -> Self
	where
		F: for<'a> Fn(&'a Ability, &'a App, &'a GuardRequest) -> CheckFuture<'a>
			+ Send
			+ Sync
			+ 'static,
	{
		Checker::Fn(Arc::new(f))
	}

	pub fn handler(handler: impl CheckHandler + 'static) -> Self {
		Checker::Handler(Arc::new(handler))
	}

	/// Checker derived from a registered permission: a type-level check of
	/// the permission's action on each of its subjects
	pub fn permission(name: impl Into<Box<str>>) -> Self {
		Checker::handler(PermissionCheck { name: name.into() })
	}

	pub async fn check(&self, ability: &Ability, app: &App, req: &GuardRequest) -> ClResult<bool> {
		match self {
			Checker::Fn(f) => f(ability, app, req).await,
			Checker::Handler(handler) => handler.handle(ability, app, req).await,
		}
	}
}

struct PermissionCheck {
	name: Box<str>,
}

#[async_trait]
impl CheckHandler for PermissionCheck {
	async fn handle(&self, ability: &Ability, app: &App, _req: &GuardRequest) -> ClResult<bool> {
		let Some(def) = app.perm_registry.permission(&self.name) else {
			return Err(Error::ConfigError(format!("unknown permission '{}'", self.name)));
		};
		if def.subject.is_empty() {
			return Ok(false);
		}
		Ok(def.subject.iter().all(|subject| ability.can(&def.action, subject)))
	}
}

// vim: ts=4
