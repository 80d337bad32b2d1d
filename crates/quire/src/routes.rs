//! HTTP routes of the application

use axum::{Json, Router, extract::State, routing::get};
use serde_json::{Value, json};
use tower_http::trace::TraceLayer;

use quire_core::guard::http::guarded;
use quire_core::menu::{MenuNode, menus_for};
use quire_core::{Ability, Auth, RouteId, RouteMetadataBuilder};

use crate::app::VERSION;
use crate::prelude::*;
use crate::websocket;

pub const HEALTH: RouteId = RouteId::new("system", "health");
pub const ME_ABILITIES: RouteId = RouteId::new("me", "abilities");
pub const ME_MENUS: RouteId = RouteId::new("me", "menus");

pub fn register_routes(meta: &mut RouteMetadataBuilder) {
	meta.guest(HEALTH);
}

pub fn init(app: &App) -> Router {
	Router::new()
		.route("/api/health", guarded(app, HEALTH, get(get_health)))
		.route("/api/me/abilities", guarded(app, ME_ABILITIES, get(get_abilities)))
		.route("/api/me/menus", guarded(app, ME_MENUS, get(get_menus)))
		.route("/ws", get(websocket::get_ws))
		.merge(quire_comment::routes(app))
		.layer(TraceLayer::new_for_http())
		.with_state(app.clone())
}

async fn get_health() -> Json<Value> {
	Json(json!({ "status": "ok", "version": VERSION }))
}

/// The caller's rules with conditions resolved for the caller
async fn get_abilities(State(app): State<App>, Auth(auth): Auth) -> ClResult<Json<Value>> {
	let principal = app.perm_adapter.load_principal(auth.user_id).await?;
	let ability = Ability::build(&principal, &app.perm_registry)?;
	Ok(Json(json!({ "user_id": auth.user_id, "rules": ability.rules() })))
}

async fn get_menus(State(app): State<App>, Auth(auth): Auth) -> ClResult<Json<Vec<MenuNode>>> {
	let principal = app.perm_adapter.load_principal(auth.user_id).await?;
	Ok(Json(menus_for(&app, &principal).await?))
}

// vim: ts=4
