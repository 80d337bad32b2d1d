//! Quire application crate.
//!
//! [`AppBuilder`] collects the adapters and options, registers the
//! permissions of every feature module, reconciles them into storage and
//! serves the HTTP and WebSocket routes.

#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![forbid(unsafe_code)]

pub mod app;
pub mod prelude;
pub mod routes;
pub mod websocket;

pub use quire_types::{auth_adapter, error, perm_adapter, types};

pub use quire_comment as comment;
pub use quire_core as core;

pub use crate::app::{App, AppBuilder, AppBuilderOpts, BootMode};

// vim: ts=4
