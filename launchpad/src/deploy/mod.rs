//! Deployment module

pub mod cleanup;
pub mod command;
pub mod executor;
pub mod fsm;
pub mod git;
pub mod platform;
pub mod registry;
pub mod service;
