//! HTTP transport of the guard
//!
//! `guard(route)` builds a middleware for `axum::middleware::from_fn_with_state`.
//! It reads the bearer token, path parameters, query and JSON body, runs
//! [`authorize`](super::authorize) and hands the restored request to the next
//! layer with the caller's `Auth` in the extensions.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use axum::{
	body::{Body, to_bytes},
	extract::{FromRequestParts, Query, RawPathParams, Request, State},
	http::{HeaderMap, HeaderName, HeaderValue, header},
	middleware::{Next, from_fn_with_state},
	response::Response,
	routing::MethodRouter,
};

use super::{GuardRequest, authorize};
use crate::extract::Auth;
use crate::prelude::*;
use crate::route_meta::RouteId;

/// Response header carrying a refreshed access token
pub const ACCESS_TOKEN_HEADER: HeaderName = HeaderName::from_static("x-access-token");

/// Largest JSON body the guard buffers for checkers
pub const MAX_GUARD_BODY: usize = 1024 * 1024;

pub type GuardOutput = Pin<Box<dyn Future<Output = Result<Response, Error>> + Send>>;

/// Middleware factory guarding the route `route`
pub fn guard(route: RouteId) -> impl Fn(State<App>, Request, Next) -> GuardOutput + Clone {
	move |state, req, next| Box::pin(guard_request(state, req, next, route))
}

/// Wraps the handlers of `method_router` in the guard for `route`
pub fn guarded(app: &App, route: RouteId, method_router: MethodRouter<App>) -> MethodRouter<App> {
	method_router.route_layer(from_fn_with_state(app.clone(), guard(route)))
}

/// Extracts the token of an `Authorization: Bearer <token>` header
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
	let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
	let token = value.strip_prefix("Bearer ")?.trim();
	(!token.is_empty()).then_some(token)
}

fn is_json(headers: &HeaderMap) -> bool {
	headers
		.get(header::CONTENT_TYPE)
		.and_then(|ct| ct.to_str().ok())
		.is_some_and(|ct| ct.starts_with("application/json"))
}

async fn guard_request(
	State(app): State<App>,
	req: Request,
	next: Next,
	route: RouteId,
) -> Result<Response, Error> {
	let (mut parts, body) = req.into_parts();

	let params: HashMap<String, String> = RawPathParams::from_request_parts(&mut parts, &app)
		.await
		.map(|params| params.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect())
		.unwrap_or_default();
	let query = Query::<HashMap<String, String>>::try_from_uri(&parts.uri)
		.map_err(|_| Error::Parse)?
		.0;

	// Buffer JSON bodies so checkers can see them, then restore for the handler
	let (json, body) = if is_json(&parts.headers) {
		let bytes = to_bytes(body, MAX_GUARD_BODY).await.map_err(|err| {
			debug!("Cannot buffer request body: {}", err);
			Error::PayloadTooLarge
		})?;
		let json = serde_json::from_slice(&bytes).ok();
		(json, Body::from(bytes))
	} else {
		(None, body)
	};

	let guard_req = GuardRequest::new(parts.method.as_str(), parts.uri.path())
		.with_params(params)
		.with_query(query)
		.with_body(json);
	let token = bearer_token(&parts.headers);
	let grant = authorize(&app, route, token, &guard_req).await?;

	if let Some(ctx) = grant.auth {
		parts.extensions.insert(Auth(ctx));
	}
	let mut res = next.run(Request::from_parts(parts, body)).await;

	if let Some(token) = grant.refreshed_token {
		let value = HeaderValue::from_str(&token)
			.map_err(|_| Error::Internal("refreshed token is not a valid header value".into()))?;
		res.headers_mut().insert(ACCESS_TOKEN_HEADER, value);
	}
	Ok(res)
}


// vim: ts=4
