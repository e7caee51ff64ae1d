//! HTTP API handlers

pub mod health;
pub mod updates;

pub use health::health_routes;
pub use updates::update_routes;
