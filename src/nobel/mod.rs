//! Nobel prizes awarded in a year, with laureate links and portraits.

pub mod client;
pub mod service;

use anyhow::Result;
use async_trait::async_trait;

pub use client::{NobelClient, WikipediaImageClient};
pub use service::{Laureate, LaureateDetails, NobelService, NobelYear, Prize};

#[async_trait]
pub trait PrizeSource: Send + Sync {
    async fn prizes(&self, year: i32) -> Result<Vec<Prize>>;
    /// Extra facts about one laureate; `None` if the id is unknown.
    async fn laureate_details(&self, id: &str) -> Result<Option<LaureateDetails>>;
}

/// Thumbnail URL for a Wikipedia article title.
#[async_trait]
pub trait PortraitSource: Send + Sync {
    async fn portrait(&self, title: &str) -> Result<Option<String>>;
}
