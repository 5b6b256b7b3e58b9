//! Film and television: TMDB catalog rankings plus Academy Award winners.

pub mod awards;
pub mod scoring;
pub mod service;
pub mod tmdb;

use anyhow::Result;
use async_trait::async_trait;

use awards::{Category, Edition, Nominee};
use tmdb::{Person, Title};

pub use awards::AwardsClient;
pub use service::{AcademyAwards, EntertainmentService, EntertainmentYear};
pub use tmdb::TmdbClient;

/// Movie and TV catalog lookups.
#[async_trait]
pub trait Catalog: Send + Sync {
    async fn discover_movies(&self, year: i32) -> Result<Vec<Title>>;
    async fn discover_series(&self, year: i32) -> Result<Vec<Title>>;
    /// Best match for a film title, if any.
    async fn search_movie(&self, title: &str) -> Result<Option<Title>>;
    async fn search_person(&self, name: &str) -> Result<Option<Person>>;
}

/// Academy Awards ceremonies, their categories and nominees.
#[async_trait]
pub trait AwardsSource: Send + Sync {
    async fn edition(&self, year: i32) -> Result<Option<Edition>>;
    async fn categories(&self, edition_id: u32) -> Result<Vec<Category>>;
    async fn nominees(&self, edition_id: u32, category_id: u32) -> Result<Vec<Nominee>>;
}
