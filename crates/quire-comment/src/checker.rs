//! Route checkers for comments
//!
//! Both look the addressed comments up in the store and evaluate the
//! caller's ability against them. A comment that does not exist denies.

use std::sync::Arc;

use async_trait::async_trait;

use quire_core::guard::GuardRequest;
use quire_core::{Ability, CheckHandler, Checker};

use crate::prelude::*;
use crate::store::{CommentId, CommentStore};

fn parse_id(id: &str) -> Option<CommentId> {
	id.parse().ok()
}

/// Function-form checker: may the caller edit the addressed comment?
pub fn can_update() -> Checker {
	Checker::from_fn(|ability, app, req| Box::pin(check_update(ability, app, req)))
}

async fn check_update(ability: &Ability, app: &App, req: &GuardRequest) -> ClResult<bool> {
	let Some(id) = req.resource_id().as_deref().and_then(parse_id) else {
		debug!("No comment id in request");
		return Ok(false);
	};
	let store = app.ext::<Arc<CommentStore>>()?;
	let comment = store.get(id)?;
	ability.can_on("update", &comment)
}

/// Handler-form checker: `action` must be allowed on every comment the
/// request addresses, by path id or by the `ids` list of the body
pub struct CommentAccess {
	pub action: &'static str,
}

impl CommentAccess {
	pub fn checker(action: &'static str) -> Checker {
		Checker::handler(CommentAccess { action })
	}
}

#[async_trait]
impl CheckHandler for CommentAccess {
	async fn handle(&self, ability: &Ability, app: &App, req: &GuardRequest) -> ClResult<bool> {
		let mut raw_ids = req.body_ids();
		if let Some(id) = req.resource_id() {
			raw_ids.push(id);
		}
		if raw_ids.is_empty() {
			return Ok(false);
		}

		let store = app.ext::<Arc<CommentStore>>()?;
		for raw in raw_ids {
			let Some(id) = parse_id(&raw) else {
				debug!(id = %raw, "Malformed comment id");
				return Ok(false);
			};
			let comment = match store.get(id) {
				Ok(comment) => comment,
				Err(Error::NotFound) => return Ok(false),
				Err(err) => return Err(err),
			};
			if !ability.can_on(self.action, &comment)? {
				return Ok(false);
			}
		}
		Ok(true)
	}
}

#[cfg(test)]
mod tests {
	use std::collections::HashMap;

	use serde_json::json;

	use super::*;

	#[test]
	fn test_parse_id() {
		assert_eq!(parse_id("12"), Some(12));
		assert_eq!(parse_id("-1"), None);
		assert_eq!(parse_id("abc"), None);
	}

	#[test]
	fn test_bulk_ids_come_from_body_and_path() {
		let mut params = HashMap::new();
		params.insert("id".to_string(), "3".to_string());
		let req = GuardRequest::new("POST", "/api/comments/delete")
			.with_params(params)
			.with_body(Some(json!({ "ids": [1, 2] })));
		let mut ids = req.body_ids();
		ids.extend(req.resource_id());
		assert_eq!(ids, vec!["1", "2", "3"]);
	}
}

// vim: ts=4
