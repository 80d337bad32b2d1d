//! Materialized-path trees
//!
//! Permissions and menus form trees stored as an explicit `parent_id` plus a
//! dot-terminated id chain (`"3.7.12."`). A node's descendants are the rows
//! whose path starts with its own path.

use std::collections::HashMap;

use quire_types::types::RowId;

use crate::prelude::*;

/// Path of a node with id `id` below a parent with path `parent_mpath`
pub fn child_mpath(parent_mpath: Option<&str>, id: RowId) -> String {
	format!("{}{}.", parent_mpath.unwrap_or_default(), id)
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Visit {
	InProgress,
	Done,
}

/// Orders named items so that every parent precedes its children.
///
/// Siblings keep their relative input order. A parent name that is not among
/// the items, or a parent chain that loops back on itself, is a configuration
/// error.
pub fn order_by_parent<'a, T>(
	items: &'a [T],
	kind: &str,
	name: impl Fn(&T) -> &str,
	parent: impl Fn(&T) -> Option<&str>,
) -> ClResult<Vec<&'a T>> {
	let index: HashMap<&str, usize> =
		items.iter().enumerate().map(|(idx, item)| (name(item), idx)).collect();
	let mut state: Vec<Option<Visit>> = vec![None; items.len()];
	let mut ordered = Vec::with_capacity(items.len());

	for start in 0..items.len() {
		// Walk up to the first unvisited ancestor chain, then emit top-down
		let mut chain = Vec::new();
		let mut cursor = Some(start);
		while let Some(idx) = cursor {
			match state[idx] {
				Some(Visit::Done) => break,
				Some(Visit::InProgress) => {
					return Err(Error::ConfigError(format!(
						"{} '{}' is part of a parent cycle",
						kind,
						name(&items[idx])
					)));
				}
				None => {}
			}
			state[idx] = Some(Visit::InProgress);
			chain.push(idx);

			cursor = match parent(&items[idx]) {
				Some(parent_name) => match index.get(parent_name) {
					Some(&parent_idx) => Some(parent_idx),
					None => {
						return Err(Error::ConfigError(format!(
							"{} '{}' refers to unknown parent '{}'",
							kind,
							name(&items[idx]),
							parent_name
						)));
					}
				},
				None => None,
			};
		}
		for idx in chain.into_iter().rev() {
			state[idx] = Some(Visit::Done);
			ordered.push(&items[idx]);
		}
	}

	Ok(ordered)
}

#[cfg(test)]
mod tests {
	use super::*;

	fn names<'a>(items: &[&'a (&'a str, Option<&'a str>)]) -> Vec<&'a str> {
		items.iter().map(|item| item.0).collect()
	}

	fn order<'a>(items: &'a [(&'a str, Option<&'a str>)]) -> ClResult<Vec<&'a (&'a str, Option<&'a str>)>> {
		order_by_parent(items, "menu", |item| item.0, |item| item.1)
	}

	#[test]
	fn test_paths() {
		let root = child_mpath(None, 3);
		let child = child_mpath(Some(&root), 7);
		assert_eq!(root, "3.");
		assert_eq!(child, "3.7.");
		assert_eq!(child_mpath(Some(&child), 12), "3.7.12.");
	}

	#[test]
	fn test_parents_come_first() {
		let items = [("c", Some("b")), ("a", None), ("b", Some("a")), ("d", None)];
		let ordered = order(&items).expect("ordered");
		assert_eq!(names(&ordered), vec!["a", "b", "c", "d"]);
	}

	#[test]
	fn test_input_order_kept_without_parents() {
		let items = [("x", None), ("y", None), ("z", Some("x"))];
		let ordered = order(&items).expect("ordered");
		assert_eq!(names(&ordered), vec!["x", "y", "z"]);
	}

	#[test]
	fn test_unknown_parent_is_config_error() {
		let items = [("a", Some("ghost"))];
		assert!(matches!(order(&items), Err(Error::ConfigError(_))));
	}

	#[test]
	fn test_cycle_is_config_error() {
		let items = [("a", Some("b")), ("b", Some("a"))];
		assert!(matches!(order(&items), Err(Error::ConfigError(_))));

		let items = [("self", Some("self"))];
		assert!(matches!(order(&items), Err(Error::ConfigError(_))));
	}
}

// vim: ts=4
