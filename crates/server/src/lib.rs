//! HTTP front end for the thermal load predictor

pub mod api;
pub mod config;
