//! Message transport of the guard
//!
//! Clients send JSON frames `{id?, event, token?, data}` over a socket. Each
//! event is registered with its own [`RouteId`] so it carries checkers just
//! like an HTTP route. A frame without a token is authorized with the token
//! the connection was opened with. Denials produce an error reply and leave
//! the connection open.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_with::skip_serializing_none;

use quire_types::auth_adapter::AuthCtx;

use super::{Grant, GuardRequest, authorize};
use crate::prelude::*;
use crate::route_meta::RouteId;

/// Method shown to checkers for transport messages
pub const MESSAGE_METHOD: &str = "MESSAGE";

#[derive(Debug, Clone, Deserialize)]
pub struct MessageFrame {
	/// Opaque client correlation id, echoed in the reply
	pub id: Option<Value>,
	pub event: Box<str>,
	pub token: Option<Box<str>>,
	#[serde(default)]
	pub data: Value,
}

#[derive(Debug, Serialize)]
pub struct ReplyError {
	pub code: &'static str,
	pub message: String,
}

impl From<&Error> for ReplyError {
	fn from(err: &Error) -> Self {
		ReplyError { code: err.status_and_code().1, message: err.public_message() }
	}
}

#[skip_serializing_none]
#[derive(Debug, Serialize)]
pub struct ReplyFrame {
	pub id: Option<Value>,
	pub event: Box<str>,
	pub ok: bool,
	pub data: Option<Value>,
	pub error: Option<ReplyError>,
	/// Replacement for an expired token, when one was refreshed
	pub token: Option<Box<str>>,
}

impl ReplyFrame {
	fn error(id: Option<Value>, event: Box<str>, err: &Error) -> Self {
		ReplyFrame { id, event, ok: false, data: None, error: Some(err.into()), token: None }
	}
}

pub type MessageFuture = BoxFuture<'static, ClResult<Value>>;

/// Handler of one event: receives the caller (if any) and the frame data
pub type MessageHandler = Arc<dyn Fn(App, Option<AuthCtx>, Value) -> MessageFuture + Send + Sync>;

#[derive(Clone)]
pub struct MessageRoute {
	pub route: RouteId,
	pub handler: MessageHandler,
}

#[derive(Default)]
pub struct MessageRouterBuilder {
	routes: HashMap<Box<str>, MessageRoute>,
}

impl MessageRouterBuilder {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn on<F, Fut>(&mut self, event: &str, route: RouteId, handler: F) -> &mut Self
	where
		F: Fn(App, Option<AuthCtx>, Value) -> Fut + Send + Sync + 'static,
		Fut: Future<Output = ClResult<Value>> + Send + 'static,
	{
		let handler: MessageHandler =
			Arc::new(move |app: App, auth: Option<AuthCtx>, data: Value| -> MessageFuture {
				Box::pin(handler(app, auth, data))
			});
		if self.routes.insert(event.into(), MessageRoute { route, handler }).is_some() {
			warn!("message event '{}' registered twice, last one wins", event);
		}
		self
	}

	pub fn build(self) -> MessageRouter {
		MessageRouter { routes: self.routes }
	}
}

/// Event table stored in `AppState`
#[derive(Default)]
pub struct MessageRouter {
	routes: HashMap<Box<str>, MessageRoute>,
}

impl std::fmt::Debug for MessageRouter {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("MessageRouter").field("events", &self.routes.keys()).finish()
	}
}

impl MessageRouter {
	pub fn get(&self, event: &str) -> Option<&MessageRoute> {
		self.routes.get(event)
	}
}

/// Runs the guard for one message. Unknown events are `NotFound`.
pub async fn authorize_message(
	app: &App,
	conn_token: Option<&str>,
	frame: &MessageFrame,
) -> ClResult<(MessageRoute, Grant)> {
	let Some(route) = app.messages.get(&frame.event).cloned() else {
		debug!(event = %frame.event, "Unknown message event");
		return Err(Error::NotFound);
	};
	let token = frame.token.as_deref().or(conn_token);
	let req = GuardRequest::new(MESSAGE_METHOD, frame.event.as_ref())
		.with_body(Some(frame.data.clone()));

	let grant = authorize(app, route.route, token, &req).await?;
	Ok((route, grant))
}

/// Outcome of [`dispatch`]
#[derive(Debug)]
pub struct Dispatched {
	/// Serialized reply frame
	pub reply: String,
	/// Refreshed connection token. Only set when the frame was authorized
	/// with the connection token, the caller should use it for later frames.
	pub conn_token: Option<Box<str>>,
}

/// Handles one text message
pub async fn dispatch(app: &App, conn_token: Option<&str>, text: &str) -> ClResult<Dispatched> {
	let (reply, conn_token) = match serde_json::from_str::<MessageFrame>(text) {
		Ok(frame) => {
			let uses_conn_token = frame.token.is_none();
			let reply = handle_frame(app, conn_token, frame).await;
			let refreshed = if uses_conn_token { reply.token.clone() } else { None };
			(reply, refreshed)
		}
		Err(err) => {
			debug!("Malformed message frame: {}", err);
			(ReplyFrame::error(None, "error".into(), &Error::Parse), None)
		}
	};
	Ok(Dispatched { reply: serde_json::to_string(&reply)?, conn_token })
}

async fn handle_frame(app: &App, conn_token: Option<&str>, frame: MessageFrame) -> ReplyFrame {
	let (route, grant) = match authorize_message(app, conn_token, &frame).await {
		Ok(res) => res,
		Err(err) => return ReplyFrame::error(frame.id, frame.event, &err),
	};

	match (route.handler)(app.clone(), grant.auth, frame.data).await {
		Ok(data) => ReplyFrame {
			id: frame.id,
			event: frame.event,
			ok: true,
			data: Some(data),
			error: None,
			token: grant.refreshed_token,
		},
		Err(err) => {
			if err.status_and_code().0.is_server_error() {
				warn!(event = %frame.event, "Message handler failed: {}", err);
			}
			let mut reply = ReplyFrame::error(frame.id, frame.event, &err);
			reply.token = grant.refreshed_token;
			reply
		}
	}
}

// vim: ts=4
