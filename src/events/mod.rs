//! Historical events for a year, taken from the Wikipedia year article.

pub mod cleaner;
pub mod client;
pub mod service;

use anyhow::Result;
use async_trait::async_trait;

pub use client::{MediaWikiClient, TocItem};
pub use service::{EventItem, EventService, EventsYear};

/// Access to a year article's table of contents and raw section wikitext.
#[async_trait]
pub trait EventSource: Send + Sync {
    async fn table_of_contents(&self, year: i32) -> Result<Vec<TocItem>>;
    async fn section_wikitext(&self, year: i32, section: &str) -> Result<String>;
}
