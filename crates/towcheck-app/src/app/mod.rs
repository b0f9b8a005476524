//! Use cases

pub mod review_service;
pub mod weigh_service;
