//! Multi-tenant client and invoice tracking API.
//!
//! Users sign up or log in for a bearer token, then create and list their
//! own clients and invoices. Every query is scoped to the authenticated
//! user; other users' rows are reported as not found.

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod models;

pub use api::{AppState, app, router};
pub use config::Config;
pub use error::{Error, Result};
