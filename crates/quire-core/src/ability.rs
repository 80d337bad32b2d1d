//! Abilities: the capability set of one principal
//!
//! An [`Ability`] is derived fresh for every authorization decision from the
//! principal's persisted permissions. Conditions are never stored, so each
//! rule is enriched from the in-memory registry entry of the same name.

use std::cmp::Ordering;
use std::collections::HashSet;

use serde::Serialize;
use serde_json::{Map, Number, Value};
use serde_with::skip_serializing_none;

use quire_types::perm_adapter::{Principal, PrincipalPermission, StoredRule};

use crate::prelude::*;
use crate::registry::{FrozenPermissionRegistry, PermissionDef, subject_name};

/// Action that matches every action
pub const MANAGE: &str = "manage";
/// Subject that matches every subject
pub const ALL: &str = "all";

pub type Conditions = Map<String, Value>;

/// Runtime rule: the persisted rule plus resolved conditions
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rule {
	pub action: Box<str>,
	pub subject: Vec<Box<str>>,
	pub conditions: Option<Conditions>,
}

impl Rule {
	pub fn matches_action(&self, action: &str) -> bool {
		self.action.as_ref() == MANAGE || self.action.as_ref() == action
	}

	pub fn matches_subject(&self, subject: &str) -> bool {
		self.subject.iter().any(|s| s.as_ref() == ALL || s.as_ref() == subject)
	}

	/// Evaluates the conditions against an instance. Unconditional rules
	/// always match.
	pub fn matches_instance(&self, instance: &Value) -> bool {
		self.conditions.as_ref().is_none_or(|conditions| matches_conditions(conditions, instance))
	}
}

/// Joins a persisted rule with the conditions declared in code
pub fn enrich(
	stored: &StoredRule,
	def: Option<&PermissionDef>,
	principal: &Principal,
) -> ClResult<Rule> {
	let conditions = match def.and_then(|def| def.conditions.as_ref()) {
		Some(conditions_fn) => match conditions_fn(principal)? {
			Value::Object(map) => Some(map),
			Value::Null => None,
			other => {
				return Err(Error::ConfigError(format!(
					"conditions must be an object, got {}",
					other
				)));
			}
		},
		None => None,
	};
	Ok(Rule { action: stored.action.clone(), subject: stored.subject.clone(), conditions })
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Ability {
	rules: Vec<Rule>,
}

impl Ability {
	/// Builds the ability of a principal.
	///
	/// Direct permissions come first, then the permissions of every role.
	/// Each permission name is used once, so its condition function runs at
	/// most once per build.
	pub fn build(principal: &Principal, registry: &FrozenPermissionRegistry) -> ClResult<Self> {
		let mut seen: HashSet<&str> = HashSet::new();
		let mut rules = Vec::new();

		let permissions = principal
			.permissions
			.iter()
			.chain(principal.roles.iter().flat_map(|role| role.permissions.iter()));
		for perm in permissions {
			if !seen.insert(perm.name.as_ref()) {
				continue;
			}
			rules.push(Self::rule_for(perm, registry, principal)?);
		}

		debug!(user_id = %principal.id, rules = rules.len(), "ability built");
		Ok(Self { rules })
	}

	fn rule_for(
		perm: &PrincipalPermission,
		registry: &FrozenPermissionRegistry,
		principal: &Principal,
	) -> ClResult<Rule> {
		enrich(&perm.rule, registry.permission(&perm.name), principal).inspect_err(|err| {
			warn!(permission = %perm.name, "condition evaluation failed: {}", err);
		})
	}

	pub fn from_rules(rules: Vec<Rule>) -> Self {
		Self { rules }
	}

	pub fn rules(&self) -> &[Rule] {
		&self.rules
	}

	/// Type-level check: any rule for the action and subject, conditions ignored
	pub fn can(&self, action: &str, subject: &str) -> bool {
		self.rules.iter().any(|rule| rule.matches_action(action) && rule.matches_subject(subject))
	}

	pub fn cannot(&self, action: &str, subject: &str) -> bool {
		!self.can(action, subject)
	}

	/// Instance-level check against the field values of `instance`
	pub fn can_instance(&self, action: &str, subject: &str, instance: &Value) -> bool {
		self.rules.iter().any(|rule| {
			rule.matches_action(action)
				&& rule.matches_subject(subject)
				&& rule.matches_instance(instance)
		})
	}

	/// Instance-level check for a serializable value, using its type name as
	/// the subject
	pub fn can_on<T: Serialize>(&self, action: &str, instance: &T) -> ClResult<bool> {
		let value = serde_json::to_value(instance)?;
		Ok(self.can_instance(action, subject_name::<T>(), &value))
	}
}

// Condition matching //
//********************//
fn matches_conditions(conditions: &Conditions, instance: &Value) -> bool {
	conditions.iter().all(|(path, expected)| matches_field(lookup(instance, path), expected))
}

/// Resolves a dotted path like `author.id` (array indexes allowed)
fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
	path.split('.').try_fold(value, |value, key| match value {
		Value::Object(map) => map.get(key),
		Value::Array(items) => key.parse::<usize>().ok().and_then(|idx| items.get(idx)),
		_ => None,
	})
}

fn is_operator_object(value: &Value) -> Option<&Conditions> {
	match value {
		Value::Object(ops) if !ops.is_empty() && ops.keys().all(|k| k.starts_with('$')) => {
			Some(ops)
		}
		_ => None,
	}
}

fn matches_field(actual: Option<&Value>, expected: &Value) -> bool {
	match is_operator_object(expected) {
		Some(ops) => ops.iter().all(|(op, operand)| apply_operator(op, actual, operand)),
		None => actual.is_some_and(|actual| equals(actual, expected)),
	}
}

fn apply_operator(op: &str, actual: Option<&Value>, operand: &Value) -> bool {
	let is_in = |actual: &Value| match operand {
		Value::Array(candidates) => candidates.iter().any(|c| equals(actual, c)),
		_ => false,
	};
	let ordering = |accept: fn(Ordering) -> bool| {
		actual.and_then(|actual| compare(actual, operand)).is_some_and(accept)
	};

	match op {
		"$eq" => actual.is_some_and(|actual| equals(actual, operand)),
		"$ne" => !actual.is_some_and(|actual| equals(actual, operand)),
		"$in" => actual.is_some_and(is_in),
		"$nin" => !actual.is_some_and(is_in),
		"$gt" => ordering(Ordering::is_gt),
		"$gte" => ordering(Ordering::is_ge),
		"$lt" => ordering(Ordering::is_lt),
		"$lte" => ordering(Ordering::is_le),
		_ => {
			warn!("unsupported condition operator: {}", op);
			false
		}
	}
}

/// Equality with array membership: an array field matches a scalar it contains
fn equals(actual: &Value, expected: &Value) -> bool {
	match (actual, expected) {
		(Value::Array(items), expected) if !expected.is_array() => {
			items.iter().any(|item| scalar_eq(item, expected))
		}
		_ => scalar_eq(actual, expected),
	}
}

fn scalar_eq(a: &Value, b: &Value) -> bool {
	match (a, b) {
		(Value::Number(a), Value::Number(b)) => compare_numbers(a, b) == Some(Ordering::Equal),
		_ => a == b,
	}
}

fn compare(a: &Value, b: &Value) -> Option<Ordering> {
	match (a, b) {
		(Value::Number(a), Value::Number(b)) => compare_numbers(a, b),
		(Value::String(a), Value::String(b)) => Some(a.cmp(b)),
		_ => None,
	}
}

/// Integers compare exactly, f64 is only used when a float is involved
fn compare_numbers(a: &Number, b: &Number) -> Option<Ordering> {
	let integer = |n: &Number| n.as_i64().map(i128::from).or_else(|| n.as_u64().map(i128::from));
	match (integer(a), integer(b)) {
		(Some(a), Some(b)) => Some(a.cmp(&b)),
		_ => a.as_f64()?.partial_cmp(&b.as_f64()?),
	}
}


// vim: ts=4
