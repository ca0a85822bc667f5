//! Launchpad HTTP API models
//!
//! Request and response bodies shared by the server and its clients.

pub mod models;
