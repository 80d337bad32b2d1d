//! Authorization guard
//!
//! One state machine decides every request and every transport message:
//!
//! 1. a supplied token is verified, with one refresh attempt on failure (401)
//! 2. guest routes are allowed
//! 3. callers without a token are allowed as anonymous
//! 4. routes without checkers are allowed
//! 5. the principal is loaded and its ability built (403 on failure)
//! 6. every checker must answer true within the checker timeout (403)
//!
//! The transports in [`http`] and [`message`] only differ in how they
//! extract the token and the [`GuardRequest`].

pub mod http;
pub mod message;

use std::collections::HashMap;

use serde_json::Value;

use quire_types::auth_adapter::AuthCtx;

use crate::ability::Ability;
use crate::prelude::*;
use crate::route_meta::RouteId;

/// Transport-independent view of a request, as seen by checkers
#[derive(Debug, Clone, Default)]
pub struct GuardRequest {
	pub method: Box<str>,
	pub path: Box<str>,
	pub params: HashMap<String, String>,
	pub query: HashMap<String, String>,
	pub body: Option<Value>,
}

impl GuardRequest {
	pub fn new(method: impl Into<Box<str>>, path: impl Into<Box<str>>) -> Self {
		Self { method: method.into(), path: path.into(), ..Self::default() }
	}

	pub fn with_params(mut self, params: HashMap<String, String>) -> Self {
		self.params = params;
		self
	}

	pub fn with_query(mut self, query: HashMap<String, String>) -> Self {
		self.query = query;
		self
	}

	pub fn with_body(mut self, body: Option<Value>) -> Self {
		self.body = body;
		self
	}

	pub fn param(&self, name: &str) -> Option<&str> {
		self.params.get(name).map(String::as_str)
	}

	pub fn query(&self, name: &str) -> Option<&str> {
		self.query.get(name).map(String::as_str)
	}

	pub fn body(&self) -> Option<&Value> {
		self.body.as_ref()
	}

	/// Id of the addressed resource: the `id` path parameter, or an `id`
	/// field of the body
	pub fn resource_id(&self) -> Option<String> {
		if let Some(id) = self.param("id") {
			return Some(id.to_string());
		}
		self.body.as_ref().and_then(|body| body.get("id")).and_then(id_string)
	}

	/// Ids listed in the `ids` array of the body. Entries that are neither
	/// strings nor numbers are skipped.
	pub fn body_ids(&self) -> Vec<String> {
		self.body
			.as_ref()
			.and_then(|body| body.get("ids"))
			.and_then(Value::as_array)
			.map(|ids| ids.iter().filter_map(id_string).collect())
			.unwrap_or_default()
	}
}

fn id_string(value: &Value) -> Option<String> {
	match value {
		Value::String(s) => Some(s.clone()),
		Value::Number(n) => Some(n.to_string()),
		_ => None,
	}
}

/// Outcome of an allowed request
#[derive(Debug, Default)]
pub struct Grant {
	/// Authenticated caller, `None` for anonymous access
	pub auth: Option<AuthCtx>,
	/// Set when the supplied token was expired and has been replaced
	pub refreshed_token: Option<Box<str>>,
}

/// Verifies a token, falling back to a single refresh attempt
pub async fn authenticate(app: &App, token: &str) -> ClResult<(AuthCtx, Option<Box<str>>)> {
	let err = match app.auth_adapter.verify_token(token).await {
		Ok(ctx) => return Ok((ctx, None)),
		Err(err) => err,
	};
	debug!("Token verification failed ({}), trying refresh", err);

	match app.auth_adapter.refresh_token(token).await {
		Ok(refreshed) => {
			info!(user_id = %refreshed.ctx.user_id, "Access token refreshed");
			Ok((refreshed.ctx, Some(refreshed.token)))
		}
		Err(err) => {
			warn!("Token refresh failed: {}", err);
			Err(Error::Unauthorized)
		}
	}
}

/// Decides whether a request to `route` may proceed
pub async fn authorize(
	app: &App,
	route: RouteId,
	token: Option<&str>,
	req: &GuardRequest,
) -> ClResult<Grant> {
	let mut grant = Grant::default();
	if let Some(token) = token {
		let (ctx, refreshed_token) = authenticate(app, token).await?;
		grant = Grant { auth: Some(ctx), refreshed_token };
	}

	if app.routes.is_guest(route) {
		debug!(%route, "Guest route, access allowed");
		return Ok(grant);
	}
	let Some(ctx) = grant.auth.as_ref() else {
		debug!(%route, "No credential, anonymous access allowed");
		return Ok(grant);
	};
	let checkers = app.routes.checkers(route);
	if checkers.is_empty() {
		debug!(%route, user_id = %ctx.user_id, "No checkers, access allowed");
		return Ok(grant);
	}

	let principal = app.perm_adapter.load_principal(ctx.user_id).await.map_err(|err| {
		warn!(%route, user_id = %ctx.user_id, error = %err, "Cannot load principal, access denied");
		Error::PermissionDenied
	})?;
	let ability = Ability::build(&principal, &app.perm_registry).map_err(|err| {
		warn!(%route, user_id = %ctx.user_id, error = %err, "Cannot build ability, access denied");
		Error::PermissionDenied
	})?;

	for (idx, checker) in checkers.iter().enumerate() {
		let res =
			tokio::time::timeout(app.opts.checker_timeout, checker.check(&ability, app, req)).await;
		match res {
			Ok(Ok(true)) => {}
			Ok(Ok(false)) => {
				warn!(%route, user_id = %ctx.user_id, checker = idx, "Access denied");
				return Err(Error::PermissionDenied);
			}
			Ok(Err(err)) => {
				warn!(%route, user_id = %ctx.user_id, checker = idx, error = %err, "Checker failed, access denied");
				return Err(Error::PermissionDenied);
			}
			Err(_) => {
				warn!(%route, user_id = %ctx.user_id, checker = idx, "Checker timed out, access denied");
				return Err(Error::PermissionDenied);
			}
		}
	}

	debug!(%route, user_id = %ctx.user_id, "Access allowed");
	Ok(grant)
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn test_resource_id_prefers_path() {
		let mut params = HashMap::new();
		params.insert("id".to_string(), "7".to_string());
		let req = GuardRequest::new("PATCH", "/api/comments/7")
			.with_params(params)
			.with_body(Some(json!({ "id": 9 })));
		assert_eq!(req.resource_id().as_deref(), Some("7"));

		let req = GuardRequest::new("PATCH", "/").with_body(Some(json!({ "id": 9 })));
		assert_eq!(req.resource_id().as_deref(), Some("9"));
		assert_eq!(GuardRequest::new("GET", "/").resource_id(), None);
	}

	#[test]
	fn test_body_ids() {
		let req = GuardRequest::new("POST", "/")
			.with_body(Some(json!({ "ids": [1, "2", null, { "x": 3 }] })));
		assert_eq!(req.body_ids(), vec!["1", "2"]);

		let req = GuardRequest::new("POST", "/").with_body(Some(json!({ "ids": "1" })));
		assert!(req.body_ids().is_empty());
	}
}

// vim: ts=4
