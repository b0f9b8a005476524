//! Domain model and services for tow-combination compliance checks

pub mod model;
pub mod repository;
pub mod service;
