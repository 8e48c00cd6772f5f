//! Interview experience submission and admin approval for the campus placement portal.

pub mod auth;
pub mod config;
pub mod envelope;
pub mod error;
pub mod pagination;
pub mod store;
pub mod telemetry;
pub mod users;
pub mod workflows;
