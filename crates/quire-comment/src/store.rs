//! In-memory comment store

use std::collections::BTreeMap;

use parking_lot::RwLock;
use serde::Serialize;

use crate::prelude::*;

/// Upper bound for a comment body, in characters
pub const MAX_BODY_LEN: usize = 4000;

pub type CommentId = u64;

#[derive(Debug, Clone, Serialize)]
pub struct Author {
	pub id: UserId,
	pub name: Box<str>,
}

/// A comment. Serialized field names double as condition paths
/// (`author.id`).
#[derive(Debug, Clone, Serialize)]
pub struct Comment {
	pub id: CommentId,
	pub author: Author,
	pub body: Box<str>,
	pub created_at: Timestamp,
	pub updated_at: Option<Timestamp>,
}

#[derive(Debug, Default)]
struct Inner {
	next_id: CommentId,
	comments: BTreeMap<CommentId, Comment>,
}

#[derive(Debug, Default)]
pub struct CommentStore {
	inner: RwLock<Inner>,
}

fn validate_body(body: &str) -> ClResult<Box<str>> {
	let body = body.trim();
	if body.is_empty() {
		return Err(Error::ValidationError("comment body must not be empty".into()));
	}
	if body.chars().count() > MAX_BODY_LEN {
		return Err(Error::ValidationError(format!(
			"comment body is longer than {} characters",
			MAX_BODY_LEN
		)));
	}
	Ok(body.into())
}

impl CommentStore {
	pub fn new() -> Self {
		Self::default()
	}

	/// All comments, oldest first
	pub fn list(&self) -> Vec<Comment> {
		self.inner.read().comments.values().cloned().collect()
	}

	pub fn get(&self, id: CommentId) -> ClResult<Comment> {
		self.inner.read().comments.get(&id).cloned().ok_or(Error::NotFound)
	}

	pub fn create(&self, author: Author, body: &str) -> ClResult<Comment> {
		let body = validate_body(body)?;
		let mut inner = self.inner.write();
		inner.next_id += 1;
		let comment =
			Comment { id: inner.next_id, author, body, created_at: Timestamp::now(), updated_at: None };
		inner.comments.insert(comment.id, comment.clone());
		Ok(comment)
	}

	pub fn update(&self, id: CommentId, body: &str) -> ClResult<Comment> {
		let body = validate_body(body)?;
		let mut inner = self.inner.write();
		let comment = inner.comments.get_mut(&id).ok_or(Error::NotFound)?;
		comment.body = body;
		comment.updated_at = Some(Timestamp::now());
		Ok(comment.clone())
	}

	pub fn delete(&self, id: CommentId) -> ClResult<()> {
		self.inner.write().comments.remove(&id).map(|_| ()).ok_or(Error::NotFound)
	}

	/// Deletes the listed comments, ignoring ids that do not exist. Returns
	/// the number of deleted comments.
	pub fn delete_many(&self, ids: &[CommentId]) -> usize {
		let mut inner = self.inner.write();
		ids.iter().filter(|id| inner.comments.remove(*id).is_some()).count()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn alice() -> Author {
		Author { id: UserId(1), name: "alice".into() }
	}

	#[test]
	fn test_create_update_delete() {
		let store = CommentStore::new();
		let first = store.create(alice(), "  hello ").expect("create");
		let second = store.create(alice(), "world").expect("create");
		assert_eq!(first.body.as_ref(), "hello");
		assert!(second.id > first.id);

		let updated = store.update(first.id, "hello again").expect("update");
		assert_eq!(updated.body.as_ref(), "hello again");
		assert!(updated.updated_at.is_some());

		store.delete(first.id).expect("delete");
		assert!(matches!(store.get(first.id), Err(Error::NotFound)));
		assert!(matches!(store.delete(first.id), Err(Error::NotFound)));
		assert_eq!(store.list().len(), 1);
	}

	#[test]
	fn test_body_validation() {
		let store = CommentStore::new();
		assert!(matches!(store.create(alice(), "   "), Err(Error::ValidationError(_))));
		let long = "x".repeat(MAX_BODY_LEN + 1);
		assert!(matches!(store.create(alice(), &long), Err(Error::ValidationError(_))));
	}

	#[test]
	fn test_delete_many_skips_missing() {
		let store = CommentStore::new();
		let a = store.create(alice(), "a").expect("create");
		let b = store.create(alice(), "b").expect("create");
		assert_eq!(store.delete_many(&[a.id, b.id, 99]), 2);
		assert!(store.list().is_empty());
	}

	#[test]
	fn test_serialized_shape() {
		let store = CommentStore::new();
		let comment = store.create(alice(), "hi").expect("create");
		let value = serde_json::to_value(&comment).expect("json");
		assert_eq!(value["author"]["id"], 1);
		assert!(value["updated_at"].is_null());
	}
}

// vim: ts=4
