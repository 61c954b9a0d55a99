//! Common library for the Inkpress publishing platform
//!
//! This crate provides shared infrastructure used across the platform's
//! services: PostgreSQL connectivity and the store-level error types.

pub mod database;
pub mod error;
