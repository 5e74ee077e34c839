pub mod app;
pub mod config;
pub mod db;
pub mod error;
pub mod filter;
pub mod handlers;
pub mod models;
pub mod report;
pub mod services;


pub use app::{AppState, SharedState, build_router};
pub use config::Config;
