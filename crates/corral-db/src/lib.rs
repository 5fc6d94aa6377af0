//! In-memory persistence layer for corral
//!
//! Repositories keep their rows in process and return them in a stable order
//! so offset pagination is deterministic.

pub mod repositories;

pub use repositories::*;

#[cfg(test)]
mod tests;
