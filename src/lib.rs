pub mod config;
pub mod cycle;
pub mod detect;
pub mod error;
pub mod fetch;
pub mod infra;
pub mod notify;
pub mod output;
pub mod retry;
pub mod services;
pub mod store;
