//! Venue recommendation service
//!
//! Extracts preference profiles from user history, scores candidate venues
//! against them and serves the results over HTTP.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod services;
