//! Command implementations for the Lumen CLI.

pub mod config;
pub mod prep;
pub mod train;
