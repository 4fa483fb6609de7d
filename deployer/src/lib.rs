//! Deployify Library
//!
//! Core modules for the Deployify deployment daemon: stack detection,
//! provider selection, builds, and provider dispatch with local fallback.

pub mod app;
pub mod deploy;
pub mod errors;
pub mod filesys;
pub mod logs;
pub mod models;
pub mod server;
pub mod storage;
pub mod store;
pub mod telemetry;
pub mod utils;
pub mod workers;
