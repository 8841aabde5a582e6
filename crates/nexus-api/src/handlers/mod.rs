//! HTTP handlers

pub mod auth;
pub mod checkpoints;
pub mod health;
pub mod products;
