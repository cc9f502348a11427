//! Command implementations.

#[cfg(feature = "graph")]
pub mod auth;
pub mod config;
pub mod schedule;
