pub mod adb;
pub mod bridge;
pub mod catalog;
pub mod commands;
pub mod config;
pub mod context;
pub mod data_url;
pub mod error;
pub mod icons;
pub mod logging;
pub mod models;
pub mod state;
pub mod workflow;
