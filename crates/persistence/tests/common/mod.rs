//! Shared helpers for the persistence integration tests.

#![allow(dead_code)]

pub mod fixtures;

pub use fixtures::*;
