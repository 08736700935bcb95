pub mod app;
pub mod concepts;
pub mod config;
pub mod database;
pub mod error;
pub mod filter;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod types;
pub mod validation;
