pub use quire_core::prelude::*;

// vim: ts=4
