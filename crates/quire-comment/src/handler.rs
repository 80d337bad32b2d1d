use std::sync::Arc;

use axum::{
	Json,
	extract::{Path, State},
	http::StatusCode,
};
use serde::Deserialize;
use serde_json::{Value, json};

use quire_core::Auth;
use quire_types::auth_adapter::AuthCtx;

use crate::prelude::*;
use crate::store::{Author, Comment, CommentId, CommentStore};

#[derive(Debug, Deserialize)]
pub struct CreateComment {
	pub body: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateComment {
	pub body: String,
}

#[derive(Debug, Deserialize)]
pub struct DeleteComments {
	pub ids: Vec<CommentId>,
}

fn author(auth: &AuthCtx) -> Author {
	Author { id: auth.user_id, name: auth.username.clone() }
}

pub async fn list_comments(State(app): State<App>) -> ClResult<Json<Vec<Comment>>> {
	let store = app.ext::<Arc<CommentStore>>()?;
	Ok(Json(store.list()))
}

pub async fn post_comment(
	State(app): State<App>,
	Auth(auth): Auth,
	Json(req): Json<CreateComment>,
) -> ClResult<Json<Comment>> {
	let store = app.ext::<Arc<CommentStore>>()?;
	let comment = store.create(author(&auth), &req.body)?;
	info!(id = comment.id, user_id = %auth.user_id, "Comment created");
	Ok(Json(comment))
}

pub async fn patch_comment(
	State(app): State<App>,
	Auth(auth): Auth,
	Path(id): Path<CommentId>,
	Json(req): Json<UpdateComment>,
) -> ClResult<Json<Comment>> {
	let store = app.ext::<Arc<CommentStore>>()?;
	let comment = store.update(id, &req.body)?;
	debug!(id, user_id = %auth.user_id, "Comment updated");
	Ok(Json(comment))
}

pub async fn delete_comment(
	State(app): State<App>,
	Auth(auth): Auth,
	Path(id): Path<CommentId>,
) -> ClResult<StatusCode> {
	let store = app.ext::<Arc<CommentStore>>()?;
	store.delete(id)?;
	info!(id, user_id = %auth.user_id, "Comment deleted");
	Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_comments(
	State(app): State<App>,
	Auth(auth): Auth,
	Json(req): Json<DeleteComments>,
) -> ClResult<Json<Value>> {
	let store = app.ext::<Arc<CommentStore>>()?;
	let deleted = store.delete_many(&req.ids);
	info!(deleted, user_id = %auth.user_id, "Comments deleted");
	Ok(Json(json!({ "deleted": deleted })))
}

// Message handlers //
//******************//
pub async fn on_create(app: App, auth: Option<AuthCtx>, data: Value) -> ClResult<Value> {
	let auth = auth.ok_or(Error::Unauthorized)?;
	let req: CreateComment = serde_json::from_value(data)?;
	let store = app.ext::<Arc<CommentStore>>()?;
	let comment = store.create(author(&auth), &req.body)?;
	Ok(serde_json::to_value(comment)?)
}

#[derive(Debug, Deserialize)]
struct UpdateMessage {
	id: CommentId,
	body: String,
}

pub async fn on_update(app: App, auth: Option<AuthCtx>, data: Value) -> ClResult<Value> {
	if auth.is_none() {
		return Err(Error::Unauthorized);
	}
	let req: UpdateMessage = serde_json::from_value(data)?;
	let store = app.ext::<Arc<CommentStore>>()?;
	let comment = store.update(req.id, &req.body)?;
	Ok(serde_json::to_value(comment)?)
}

// vim: ts=4
