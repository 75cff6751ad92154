pub mod ai_provider;
pub mod batch;
pub mod cli;
pub mod config;
pub mod error;
pub mod runner;
