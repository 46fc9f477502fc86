//! HTTP handlers

pub mod analysis;
pub mod health;
pub mod rules;
