pub mod app;
pub mod config;
pub mod counters;
pub mod domain;
pub mod error;
pub mod feed;
pub mod fetch;
pub mod incoming;
pub mod output;
pub mod reconcile;
pub mod resolver;
pub mod store;
