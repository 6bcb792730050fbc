pub mod app;
pub mod catalog;
pub mod config;
pub mod debounce;
pub mod detail;
pub mod error;
pub mod favorites;
pub mod query;
pub mod store;
pub mod trending;
pub mod utils;
