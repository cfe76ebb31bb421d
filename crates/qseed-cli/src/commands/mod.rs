//! CLI command implementations.

pub mod backends;
pub mod common;
pub mod draw;
pub mod seed;
pub mod version;
