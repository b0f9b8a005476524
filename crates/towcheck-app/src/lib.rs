//! Application service layer - config, repository openers, use cases

pub mod app;
pub mod config;
pub mod repository;
