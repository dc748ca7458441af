pub mod auth;
pub mod cli;
pub mod config;
pub mod controllers;
pub mod domain;
pub mod handlers;
pub mod infrastructure;
pub mod notify;
pub mod session;
