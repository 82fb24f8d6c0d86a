//! Shared test utilities for jlv integration harnesses.
//!
//! Import everything you need via `mod common; use common::*;` at the top of
//! each harness file. Fixtures are static; file-backed helpers live in temp
//! directories that are removed when the returned guard drops.

#![allow(dead_code)]

pub mod assertions;
pub mod builders;
pub mod fake_source;
pub mod fixtures;

pub use assertions::*;
pub use builders::*;
pub use fake_source::*;
pub use fixtures::*;
