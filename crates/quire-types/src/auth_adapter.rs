//! Adapter that verifies, refreshes and issues access tokens.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use std::fmt::Debug;

use crate::prelude::*;

pub const ACCESS_TOKEN_EXPIRY: i64 = 3600;

/// Access tokens are used to authenticate users
#[skip_serializing_none]
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct AccessToken<S> {
	/// User id of the token owner
	pub sub: i64,
	/// Username at the time of issue
	pub name: S,
	pub scope: Option<S>,
	pub iat: Timestamp,
	pub exp: Timestamp,
}

/// Context struct for an authenticated user
#[derive(Clone, Debug)]
pub struct AuthCtx {
	pub user_id: UserId,
	pub username: Box<str>,
}

/// Result of a successful token refresh
#[derive(Debug)]
pub struct RefreshedToken {
	pub ctx: AuthCtx,
	pub token: Box<str>,
}

#[async_trait]
pub trait AuthAdapter: Debug + Send + Sync {
	/// Verifies a bearer credential. Fails with `Error::Unauthorized` when the
	/// token is malformed, badly signed or expired.
	async fn verify_token(&self, token: &str) -> ClResult<AuthCtx>;

	/// Attempts to exchange an expired (but otherwise valid) credential for a
	/// fresh one.
	async fn refresh_token(&self, token: &str) -> ClResult<RefreshedToken>;

	/// Issues a new access token for a user
	async fn create_token(&self, user_id: UserId, username: &str) -> ClResult<Box<str>>;
}

// vim: ts=4
