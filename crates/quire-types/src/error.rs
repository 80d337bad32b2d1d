//! Error type shared by every Quire crate

use axum::{Json, http::StatusCode, response::IntoResponse};

pub type ClResult<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
	NotFound,
	/// Authorization failure: the caller is known but not allowed
	PermissionDenied,
	/// Authentication failure: missing, invalid or expired credential
	Unauthorized,
	DbError,
	Parse,
	Timeout,
	PayloadTooLarge,
	ValidationError(String),
	ConfigError(String),
	Internal(String),

	// externals
	Io(std::io::Error),
}

impl Error {
	pub fn status_and_code(&self) -> (StatusCode, &'static str) {
		match self {
			Error::NotFound => (StatusCode::NOT_FOUND, "E-CORE-NOTFOUND"),
			Error::PermissionDenied => (StatusCode::FORBIDDEN, "E-AUTH-NOPERM"),
			Error::Unauthorized => (StatusCode::UNAUTHORIZED, "E-AUTH-UNAUTH"),
			Error::ValidationError(_) => (StatusCode::BAD_REQUEST, "E-VAL-INVALID"),
			Error::Parse => (StatusCode::BAD_REQUEST, "E-CORE-PARSE"),
			Error::Timeout => (StatusCode::GATEWAY_TIMEOUT, "E-CORE-TIMEOUT"),
			Error::PayloadTooLarge => (StatusCode::PAYLOAD_TOO_LARGE, "E-VAL-TOOLARGE"),
			Error::DbError => (StatusCode::INTERNAL_SERVER_ERROR, "E-CORE-DBERR"),
			Error::ConfigError(_) | Error::Internal(_) | Error::Io(_) => {
				(StatusCode::INTERNAL_SERVER_ERROR, "E-CORE-INTERNAL")
			}
		}
	}

	/// Message that is safe to show to clients
	pub fn public_message(&self) -> String {
		match self {
			Error::NotFound => "Resource not found".into(),
			Error::PermissionDenied => "Permission denied".into(),
			Error::Unauthorized => "Authentication required".into(),
			Error::ValidationError(msg) => msg.clone(),
			Error::Parse => "Malformed request".into(),
			Error::Timeout => "Request timed out".into(),
			Error::PayloadTooLarge => "Request body too large".into(),
			_ => "Internal server error".into(),
		}
	}
}

impl From<std::io::Error> for Error {
	fn from(err: std::io::Error) -> Self {
		Self::Io(err)
	}
}

impl From<serde_json::Error> for Error {
	fn from(err: serde_json::Error) -> Self {
		tracing::debug!("JSON error: {}", err);
		Self::Parse
	}
}

impl std::fmt::Display for Error {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		match self {
			Error::ValidationError(msg) => write!(f, "validation error: {}", msg),
			Error::ConfigError(msg) => write!(f, "configuration error: {}", msg),
			Error::Internal(msg) => write!(f, "internal error: {}", msg),
			Error::Io(err) => write!(f, "I/O error: {}", err),
			_ => write!(f, "{:?}", self),
		}
	}
}

impl std::error::Error for Error {}

impl IntoResponse for Error {
	fn into_response(self) -> axum::response::Response {
		let (status, code) = self.status_and_code();
		if status.is_server_error() {
			tracing::warn!("Request failed: {}", self);
		}
		let body = serde_json::json!({
			"error": {
				"code": code,
				"message": self.public_message(),
			}
		});
		(status, Json(body)).into_response()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_auth_errors_map_to_distinct_statuses() {
		assert_eq!(Error::Unauthorized.status_and_code().0, StatusCode::UNAUTHORIZED);
		assert_eq!(Error::PermissionDenied.status_and_code().0, StatusCode::FORBIDDEN);
		assert_eq!(
			Error::PayloadTooLarge.status_and_code(),
			(StatusCode::PAYLOAD_TOO_LARGE, "E-VAL-TOOLARGE")
		);
	}

	#[test]
	fn test_internal_details_are_not_exposed() {
		let err = Error::Internal("checker panicked on row 42".into());
		assert_eq!(err.public_message(), "Internal server error");
	}
}

// vim: ts=4
