//! Comment module
//!
//! A small feature module built on the authorization engine: it registers
//! its permissions, attaches checkers to its routes and message events and
//! keeps its store in the app extensions.

#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![forbid(unsafe_code)]

pub mod checker;
pub mod handler;
pub mod perm;
mod prelude;
pub mod store;

use std::sync::Arc;

use axum::{
	Router,
	routing::{delete, get, patch, post},
};

use quire_core::guard::http::guarded;
use quire_core::guard::message::MessageRouterBuilder;
use quire_core::{Extensions, RouteId, RouteMetadataBuilder};

use crate::checker::{CommentAccess, can_update};
use crate::prelude::*;
use crate::store::CommentStore;

pub use perm::register_permissions;

pub const CONTROLLER: &str = "comment";

pub const LIST: RouteId = RouteId::new(CONTROLLER, "list");
pub const CREATE: RouteId = RouteId::new(CONTROLLER, "create");
pub const UPDATE: RouteId = RouteId::new(CONTROLLER, "update");
pub const DELETE: RouteId = RouteId::new(CONTROLLER, "delete");
pub const DELETE_MANY: RouteId = RouteId::new(CONTROLLER, "delete_many");
pub const MSG_CREATE: RouteId = RouteId::new(CONTROLLER, "message_create");
pub const MSG_UPDATE: RouteId = RouteId::new(CONTROLLER, "message_update");

/// Stores the comment store in the app extensions
pub fn init_extensions(extensions: &mut Extensions) {
	extensions.insert(Arc::new(CommentStore::new()));
}

/// Attach checkers to the comment routes and message events
pub fn register_routes(routes: &mut RouteMetadataBuilder) {
	routes
		.guest(LIST)
		.permissions(CREATE, &[perm::COMMENT_CREATE])
		.checkers(UPDATE, [can_update()])
		.checkers(DELETE, [CommentAccess::checker("delete")])
		.checkers(DELETE_MANY, [CommentAccess::checker("delete")])
		.permissions(MSG_CREATE, &[perm::COMMENT_CREATE])
		.checkers(MSG_UPDATE, [can_update()]);
}

pub fn register_messages(messages: &mut MessageRouterBuilder) {
	messages
		.on("comment.create", MSG_CREATE, handler::on_create)
		.on("comment.update", MSG_UPDATE, handler::on_update);
}

pub fn routes(app: &App) -> Router<App> {
	Router::new()
		.route(
			"/api/comments",
			guarded(app, LIST, get(handler::list_comments))
				.merge(guarded(app, CREATE, post(handler::post_comment))),
		)
		.route(
			"/api/comments/{id}",
			guarded(app, UPDATE, patch(handler::patch_comment))
				.merge(guarded(app, DELETE, delete(handler::delete_comment))),
		)
		.route("/api/comments/delete", guarded(app, DELETE_MANY, post(handler::delete_comments)))
}

// vim: ts=4
