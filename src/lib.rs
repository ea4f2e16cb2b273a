pub mod api;
pub mod cli;
pub mod config;
pub mod data_exporter;
pub mod notifications;
pub mod services;
pub mod utils;
pub mod yank_manager;
