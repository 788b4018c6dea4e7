//! # Pulse Library
//!
//! This library exposes the Pulse application modules for testing and
//! integration.
//!
//! The main binary uses these modules through the `main.rs` entry point.

pub mod api;
pub mod auth;
pub mod cli;
pub mod config;
pub mod engine;

// Re-export pulse_core for convenience
pub use pulse_core;
