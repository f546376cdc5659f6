//! HTTP front end for the rental price prediction service

pub mod api;
pub mod config;
