//! Library exports for healthgate, shared between the binary and tests.

pub mod access;
pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod startup;
pub mod state;
pub mod store;
pub mod utils;
