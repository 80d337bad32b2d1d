//! Shared types, adapter traits, and core utilities for the Quire platform.
//!
//! This crate contains the foundational types that are shared between the
//! authorization engine, the feature modules and all adapter implementations.
//! Keeping them in a separate crate lets adapter crates compile without
//! depending on the engine itself.

pub mod auth_adapter;
pub mod error;
pub mod perm_adapter;
pub mod prelude;
pub mod types;

// vim: ts=4
