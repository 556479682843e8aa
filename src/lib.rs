pub mod app;
pub mod auth;
pub mod client;
pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod memory;
pub mod state;
pub mod tasks;
