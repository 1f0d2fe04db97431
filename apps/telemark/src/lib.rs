//! # Telemark
//!
//! Profile server library: host API, usage analytics service, configuration
//! and CLI. The binary in `main.rs` is a thin wrapper around [`cli`].

pub mod analytics;
pub mod api;
pub mod cli;
pub mod config;
