pub mod api;
pub mod config;
pub mod error;
pub mod monitor;
pub mod operator;
pub mod report;
pub mod shutdown;
pub mod workflow;
