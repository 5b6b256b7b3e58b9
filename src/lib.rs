pub mod app;
pub mod cache;
pub mod cli;
pub mod config;
pub mod credentials;
pub mod entertainment;
pub mod events;
pub mod http;
pub mod json;
pub mod logging;
pub mod music;
pub mod nobel;
pub mod state;
pub mod utils;
pub mod web;
pub mod year;
