pub mod alerts;
pub mod asset_cache;
pub mod collaborators;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod event_log;
pub mod feed;
pub mod geo;
pub mod model;
pub mod store;

#[cfg(test)]
mod sim_test;
