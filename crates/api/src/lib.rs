//! Audiotracks API server library.
//!
//! Exposes config, state, error handling, the upload/edit/delete flows and
//! the routes so integration tests and the binary can share them.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod library;
pub mod middleware;
pub mod response;
pub mod router;
pub mod routes;
pub mod state;
