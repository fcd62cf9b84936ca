//! HTTP handlers for the calculator service.

pub mod calculate;
pub mod health;
