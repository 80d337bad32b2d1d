//! JWT-backed token adapter
//!
//! Access tokens are HS256-signed [`AccessToken`] claims. A token that expired
//! less than [`REFRESH_WINDOW`] seconds ago can be exchanged for a fresh one.

use std::fmt::Debug;

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};

use quire_types::auth_adapter::{
	ACCESS_TOKEN_EXPIRY, AccessToken, AuthAdapter, AuthCtx, RefreshedToken,
};
use quire_types::prelude::*;

/// Seconds after expiry during which a token is still refreshable
pub const REFRESH_WINDOW: i64 = 7 * 24 * 3600;

pub struct AuthAdapterJwt {
	encoding_key: EncodingKey,
	decoding_key: DecodingKey,
	expiry: i64,
}

impl Debug for AuthAdapterJwt {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("AuthAdapterJwt").field("expiry", &self.expiry).finish_non_exhaustive()
	}
}

impl AuthAdapterJwt {
	pub fn new(secret: &str) -> ClResult<Self> {
		if secret.is_empty() {
			return Err(Error::ConfigError("JWT secret must not be empty".into()));
		}
		Ok(Self {
			encoding_key: EncodingKey::from_secret(secret.as_bytes()),
			decoding_key: DecodingKey::from_secret(secret.as_bytes()),
			expiry: ACCESS_TOKEN_EXPIRY,
		})
	}

	/// Overrides the lifetime of issued tokens (seconds)
	pub fn with_expiry(mut self, expiry: i64) -> Self {
		self.expiry = expiry;
		self
	}

	fn decode(&self, token: &str, validate_exp: bool) -> ClResult<AccessToken<Box<str>>> {
		let mut validation = Validation::new(Algorithm::HS256);
		validation.validate_exp = validate_exp;
		validation.leeway = 0;
		decode::<AccessToken<Box<str>>>(token, &self.decoding_key, &validation)
			.map(|data| data.claims)
			.map_err(|err| {
				debug!("token rejected: {}", err);
				Error::Unauthorized
			})
	}

	fn issue(&self, claims: &AccessToken<&str>) -> ClResult<Box<str>> {
		encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
			.map(Into::into)
			.map_err(|err| Error::Internal(format!("token encoding: {}", err)))
	}
}

fn auth_ctx(claims: &AccessToken<Box<str>>) -> AuthCtx {
	AuthCtx { user_id: UserId(claims.sub), username: claims.name.clone() }
}

#[async_trait]
impl AuthAdapter for AuthAdapterJwt {
	async fn verify_token(&self, token: &str) -> ClResult<AuthCtx> {
		let claims = self.decode(token, true)?;
		Ok(auth_ctx(&claims))
	}

	async fn refresh_token(&self, token: &str) -> ClResult<RefreshedToken> {
		// Signature is still checked, only the expiry is relaxed
		let claims = self.decode(token, false)?;
		if claims.exp.add_seconds(REFRESH_WINDOW) < Timestamp::now() {
			debug!(user_id = claims.sub, "token is past the refresh window");
			return Err(Error::Unauthorized);
		}

		let ctx = auth_ctx(&claims);
		let token = self.create_token(ctx.user_id, &ctx.username).await?;
		info!(user_id = %ctx.user_id, "access token refreshed");
		Ok(RefreshedToken { ctx, token })
	}

	async fn create_token(&self, user_id: UserId, username: &str) -> ClResult<Box<str>> {
		let iat = Timestamp::now();
		let claims = AccessToken {
			sub: user_id.0,
			name: username,
			scope: None,
			iat,
			exp: iat.add_seconds(self.expiry),
		};
		self.issue(&claims)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const SECRET: &str = "test-secret";

	fn expired_token(adapter: &AuthAdapterJwt, seconds_ago: i64) -> Box<str> {
		let exp = Timestamp::now().add_seconds(-seconds_ago);
		let claims = AccessToken {
			sub: 7,
			name: "alice",
			scope: None,
			iat: exp.add_seconds(-ACCESS_TOKEN_EXPIRY),
			exp,
		};
		adapter.issue(&claims).expect("issue")
	}

	#[tokio::test]
	async fn test_create_and_verify() {
		let adapter = AuthAdapterJwt::new(SECRET).expect("adapter");
		let token = adapter.create_token(UserId(7), "alice").await.expect("token");

		let ctx = adapter.verify_token(&token).await.expect("verify");
		assert_eq!(ctx.user_id, UserId(7));
		assert_eq!(ctx.username.as_ref(), "alice");
	}

	#[tokio::test]
	async fn test_wrong_secret_is_unauthorized() {
		let issuer = AuthAdapterJwt::new("other-secret").expect("adapter");
		let adapter = AuthAdapterJwt::new(SECRET).expect("adapter");
		let token = issuer.create_token(UserId(7), "alice").await.expect("token");

		assert!(matches!(adapter.verify_token(&token).await, Err(Error::Unauthorized)));
		assert!(matches!(adapter.refresh_token(&token).await, Err(Error::Unauthorized)));
	}

	#[tokio::test]
	async fn test_garbage_is_unauthorized() {
		let adapter = AuthAdapterJwt::new(SECRET).expect("adapter");
		assert!(matches!(adapter.verify_token("not-a-jwt").await, Err(Error::Unauthorized)));
	}

	#[tokio::test]
	async fn test_expired_token_refreshes() {
		let adapter = AuthAdapterJwt::new(SECRET).expect("adapter");
		let token = expired_token(&adapter, 600);

		assert!(matches!(adapter.verify_token(&token).await, Err(Error::Unauthorized)));

		let refreshed = adapter.refresh_token(&token).await.expect("refresh");
		assert_eq!(refreshed.ctx.user_id, UserId(7));
		let ctx = adapter.verify_token(&refreshed.token).await.expect("fresh token verifies");
		assert_eq!(ctx.username.as_ref(), "alice");
	}

	#[tokio::test]
	async fn test_token_past_refresh_window() {
		let adapter = AuthAdapterJwt::new(SECRET).expect("adapter");
		let token = expired_token(&adapter, REFRESH_WINDOW + 60);

		assert!(matches!(adapter.refresh_token(&token).await, Err(Error::Unauthorized)));
	}

	#[test]
	fn test_empty_secret_rejected() {
		assert!(matches!(AuthAdapterJwt::new(""), Err(Error::ConfigError(_))));
	}
}

// vim: ts=4
