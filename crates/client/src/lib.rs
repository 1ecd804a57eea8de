//! Session and authorization client for the roster backend.
//!
//! Provides the durable credential store, the HTTP gateway that attaches
//! the bearer token and reacts to authorization failures, the one-time
//! session bootstrap, and the [`auth::AuthContext`] facade that the rest
//! of a front-end talks to.

pub mod api;
pub mod auth;
pub mod bootstrap;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod gateway;
pub mod guard;
pub mod middleware;
pub mod navigation;
pub mod oauth;
pub mod session;
pub mod store;
