pub mod actors;
pub mod api;
pub mod clients;
pub mod config;
pub mod domain;
pub mod messaging;
pub mod metrics;
pub mod persistence;
pub mod utils;
