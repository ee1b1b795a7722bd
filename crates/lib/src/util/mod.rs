//! Shared utilities.
//!
//! Directory hashing for the store, and helpers for tests.

pub mod hash;

#[cfg(test)]
pub mod testutil;
