//! inkpost - article service with token-based sessions
//!
//! Users register and log in to receive a short-lived access token and a
//! longer-lived refresh token, both bound to a session record kept in a
//! TTL store. Every protected request is checked against that record, so
//! logging out revokes both tokens at once.

pub mod api;
pub mod cache;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
