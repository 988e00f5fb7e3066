//! github-notifier - fans webhook events out to chat and social backends
//!
//! This library resolves the routing configuration (sources, destinations
//! and who notifies whom) from a structured config and the process
//! environment, and dispatches payloads to Misskey and Discord.

pub mod cli;
pub mod config;
pub mod core;
pub mod notification;
pub mod services;

// Re-export core types for convenience
pub use crate::core::*;
