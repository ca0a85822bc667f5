//! Launchpad Library
//!
//! Deployment engine and HTTP API for publishing Git repositories through a
//! platform CLI.

pub mod app;
pub mod authn;
pub mod deploy;
pub mod errors;
pub mod filesys;
pub mod logs;
pub mod models;
pub mod server;
pub mod storage;
pub mod telemetry;
pub mod utils;
