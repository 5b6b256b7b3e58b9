//! HTTP API for year overviews.

pub mod error;
pub mod routes;
pub mod years;

pub use routes::*;
