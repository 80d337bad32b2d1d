//! End-to-end scenario through the assembled application
//!
//! Boots the app with SQLite and JWT adapters, grants roles the way an
//! administrator would and drives the comment routes over HTTP.

use std::sync::Arc;

use axum::{
	Router,
	body::{Body, to_bytes},
	http::{Method, Request, StatusCode, header},
};
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;

use quire::AppBuilder;
use quire::auth_adapter::AuthAdapter;
use quire::comment::perm::{CUSTOM_USER_ROLE, MODERATOR_ROLE};
use quire::perm_adapter::PermAdapter;
use quire_auth_adapter_jwt::AuthAdapterJwt;
use quire_perm_adapter_sqlite::PermAdapterSqlite;

const SECRET: &str = "scenario-secret";

struct Fixture {
	router: Router,
	perm: Arc<PermAdapterSqlite>,
	auth: Arc<AuthAdapterJwt>,
	_temp: TempDir,
}

impl Fixture {
	async fn new() -> Self {
		let temp = TempDir::new().expect("temp dir");
		let perm = Arc::new(PermAdapterSqlite::new(temp.path()).await.expect("perm adapter"));
		let auth = Arc::new(AuthAdapterJwt::new(SECRET).expect("auth adapter"));
		perm.create_user("root").await.expect("root user");

		let mut builder = AppBuilder::new();
		builder
			.admin_user("root")
			.auth_adapter(auth.clone())
			.perm_adapter(perm.clone());
		let (_app, router) = builder.build().await.expect("build app");

		Fixture { router, perm, auth, _temp: temp }
	}

	/// Creates a user holding `roles` and returns an access token for it
	async fn user(&self, username: &str, roles: &[&str]) -> String {
		let user_id = self.perm.create_user(username).await.expect("create user");
		for role in roles {
			self.perm.grant_role(user_id, role).await.expect("grant role");
		}
		self.token(username).await
	}

	async fn token(&self, username: &str) -> String {
		let user_id = self.perm.read_user_id(username).await.expect("user id");
		self.auth.create_token(user_id, username).await.expect("token").to_string()
	}

	async fn call(
		&self,
		method: Method,
		uri: &str,
		token: Option<&str>,
		body: Option<Value>,
	) -> (StatusCode, Value) {
		let mut req = Request::builder().method(method).uri(uri);
		if let Some(token) = token {
			req = req.header(header::AUTHORIZATION, format!("Bearer {}", token));
		}
		let req = match body {
			Some(body) => req
				.header(header::CONTENT_TYPE, "application/json")
				.body(Body::from(body.to_string())),
			None => req.body(Body::empty()),
		}
		.expect("request");

		let res = self.router.clone().oneshot(req).await.expect("response");
		let status = res.status();
		let bytes = to_bytes(res.into_body(), usize::MAX).await.expect("body");
		let value = if bytes.is_empty() {
			Value::Null
		} else {
			serde_json::from_slice(&bytes).expect("json body")
		};
		(status, value)
	}
}

#[tokio::test]
async fn test_custom_user_edits_only_own_comments() {
	let fx = Fixture::new().await;
	let alice = fx.user("alice", &[CUSTOM_USER_ROLE]).await;
	let bob = fx.user("bob", &[CUSTOM_USER_ROLE]).await;

	let (status, own) =
		fx.call(Method::POST, "/api/comments", Some(alice.as_str()), Some(json!({ "body": "first" }))).await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(own["body"], "first");
	let own_id = own["id"].as_u64().expect("comment id");

	let (status, other) =
		fx.call(Method::POST, "/api/comments", Some(bob.as_str()), Some(json!({ "body": "second" }))).await;
	assert_eq!(status, StatusCode::OK);
	let other_id = other["id"].as_u64().expect("comment id");

	let (status, updated) = fx
		.call(
			Method::PATCH,
			&format!("/api/comments/{}", own_id),
			Some(alice.as_str()),
			Some(json!({ "body": "first, edited" })),
		)
		.await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(updated["body"], "first, edited");

	let (status, body) = fx
		.call(
			Method::PATCH,
			&format!("/api/comments/{}", other_id),
			Some(alice.as_str()),
			Some(json!({ "body": "hijacked" })),
		)
		.await;
	assert_eq!(status, StatusCode::FORBIDDEN);
	assert_eq!(body["error"]["code"], "E-AUTH-NOPERM");

	let (status, comments) = fx.call(Method::GET, "/api/comments", None, None).await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(comments[1]["body"], "second");
}

#[tokio::test]
async fn test_create_requires_credential_and_role() {
	let fx = Fixture::new().await;
	let nobody = fx.user("nobody", &[]).await;

	let (status, body) =
		fx.call(Method::POST, "/api/comments", None, Some(json!({ "body": "anon" }))).await;
	assert_eq!(status, StatusCode::UNAUTHORIZED);
	assert_eq!(body["error"]["code"], "E-AUTH-UNAUTH");

	let (status, _) =
		fx.call(Method::POST, "/api/comments", Some(nobody.as_str()), Some(json!({ "body": "hi" }))).await;
	assert_eq!(status, StatusCode::FORBIDDEN);

	let (status, _) =
		fx.call(Method::POST, "/api/comments", Some("not-a-token"), Some(json!({ "body": "hi" }))).await;
	assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_delete_rules() {
	let fx = Fixture::new().await;
	let alice = fx.user("alice", &[CUSTOM_USER_ROLE]).await;
	let bob = fx.user("bob", &[CUSTOM_USER_ROLE]).await;
	let moderator = fx.user("mod", &[MODERATOR_ROLE]).await;

	let mut ids = Vec::new();
	for (token, text) in [(&alice, "a1"), (&alice, "a2"), (&bob, "b1")] {
		let (_, comment) =
			fx.call(Method::POST, "/api/comments", Some(token.as_str()), Some(json!({ "body": text }))).await;
		ids.push(comment["id"].as_u64().expect("comment id"));
	}

	// Bulk delete is denied as a whole when one id belongs to someone else
	let (status, _) = fx
		.call(Method::POST, "/api/comments/delete", Some(alice.as_str()), Some(json!({ "ids": ids })))
		.await;
	assert_eq!(status, StatusCode::FORBIDDEN);

	let (status, body) = fx
		.call(
			Method::POST,
			"/api/comments/delete",
			Some(alice.as_str()),
			Some(json!({ "ids": [ids[0], ids[1]] })),
		)
		.await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(body["deleted"], 2);

	let (status, _) =
		fx.call(Method::DELETE, &format!("/api/comments/{}", ids[2]), Some(alice.as_str()), None).await;
	assert_eq!(status, StatusCode::FORBIDDEN);

	let (status, _) =
		fx.call(Method::DELETE, &format!("/api/comments/{}", ids[2]), Some(moderator.as_str()), None).await;
	assert_eq!(status, StatusCode::NO_CONTENT);

	// A comment that no longer exists denies instead of leaking a 404
	let (status, _) =
		fx.call(Method::DELETE, &format!("/api/comments/{}", ids[2]), Some(moderator.as_str()), None).await;
	assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_admin_user_manages_everything() {
	let fx = Fixture::new().await;
	let alice = fx.user("alice", &[CUSTOM_USER_ROLE]).await;
	let root = fx.token("root").await;

	let (_, comment) =
		fx.call(Method::POST, "/api/comments", Some(alice.as_str()), Some(json!({ "body": "mine" }))).await;
	let (status, _) = fx
		.call(
			Method::PATCH,
			&format!("/api/comments/{}", comment["id"]),
			Some(root.as_str()),
			Some(json!({ "body": "moderated" })),
		)
		.await;
	assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_me_endpoints() {
	let fx = Fixture::new().await;
	let alice = fx.user("alice", &[CUSTOM_USER_ROLE]).await;
	let root = fx.token("root").await;

	let (status, abilities) = fx.call(Method::GET, "/api/me/abilities", Some(alice.as_str()), None).await;
	assert_eq!(status, StatusCode::OK);
	let rules = abilities["rules"].as_array().expect("rules");
	assert_eq!(rules.len(), 3);
	let update = rules.iter().find(|rule| rule["action"] == "update").expect("update rule");
	assert_eq!(update["conditions"]["author.id"], abilities["user_id"]);

	let (status, menus) = fx.call(Method::GET, "/api/me/menus", Some(alice.as_str()), None).await;
	assert_eq!(status, StatusCode::OK);
	let community = menus
		.as_array()
		.expect("menus")
		.iter()
		.find(|menu| menu["name"] == "community")
		.expect("community menu");
	let children: Vec<&str> = community["children"]
		.as_array()
		.expect("children")
		.iter()
		.filter_map(|child| child["name"].as_str())
		.collect();
	assert_eq!(children, vec!["comments"]);

	let (_, menus) = fx.call(Method::GET, "/api/me/menus", Some(root.as_str()), None).await;
	let community = menus
		.as_array()
		.expect("menus")
		.iter()
		.find(|menu| menu["name"] == "community")
		.expect("community menu");
	assert_eq!(community["children"].as_array().map(Vec::len), Some(2));

	let (status, _) = fx.call(Method::GET, "/api/me/menus", None, None).await;
	assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_health_is_public() {
	let fx = Fixture::new().await;
	let (status, body) = fx.call(Method::GET, "/api/health", None, None).await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(body["status"], "ok");

	let (status, _) = fx.call(Method::GET, "/api/health", Some("garbage"), None).await;
	assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// vim: ts=4
