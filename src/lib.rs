pub mod api;
pub mod auth;
pub mod config;
pub mod core;
pub mod error;
pub mod log;
pub mod session;

// Decoupled logic/render loop
pub mod app;
pub mod render;
pub mod tea;
pub mod ui;

pub use error::{Error, Result};
