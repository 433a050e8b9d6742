//! Shared types for the Kit Network API.
//!
//! `models` holds the domain records handed between the store and the auth
//! layer; `api` holds the JSON request and response bodies.

pub mod api;
pub mod models;
