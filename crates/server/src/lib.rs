//! HTTP surface of seedwarden: shared state and the JSON API router.

pub mod api;
pub mod state;
