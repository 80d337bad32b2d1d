//! Users and their grants

use sqlx::{Row, SqliteConnection};

use crate::utils::{db_err, map_res};
use quire_types::prelude::*;

pub(crate) async fn create(conn: &mut SqliteConnection, username: &str) -> ClResult<UserId> {
	let res = sqlx::query("INSERT INTO users (username) VALUES (?) RETURNING user_id")
		.bind(username)
		.fetch_one(&mut *conn)
		.await;
	match res {
		Err(sqlx::Error::Database(err)) if err.is_unique_violation() => {
			Err(Error::ValidationError(format!("user '{}' already exists", username)))
		}
		res => map_res(res, |row| row.try_get("user_id").map(UserId)),
	}
}

pub(crate) async fn find(conn: &mut SqliteConnection, username: &str) -> ClResult<Option<UserId>> {
	let row = sqlx::query("SELECT user_id FROM users WHERE username = ?")
		.bind(username)
		.fetch_optional(&mut *conn)
		.await
		.map_err(db_err)?;

	match row {
		Some(row) => map_res(Ok(row), |row| row.try_get("user_id").map(UserId)).map(Some),
		None => Ok(None),
	}
}

/// Username for an existing user
pub(crate) async fn read_username(conn: &mut SqliteConnection, user_id: UserId) -> ClResult<Box<str>> {
	let res = sqlx::query("SELECT username FROM users WHERE user_id = ?")
		.bind(user_id.0)
		.fetch_one(&mut *conn)
		.await;
	map_res(res, |row| row.try_get::<String, _>("username").map(Into::into))
}

// vim: ts=4
