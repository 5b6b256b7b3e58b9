//! Academy Awards data from `theawards.vercel.app`.

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::entertainment::AwardsSource;
use crate::http::fetch_json;

const AWARDS_API_URL: &str = "https://theawards.vercel.app/api";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edition {
    pub id: u32,
    #[serde(default)]
    pub name: Option<String>,
    /// Ceremony number, e.g. 92.
    #[serde(default)]
    pub edition: Option<u32>,
    #[serde(default)]
    pub year: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Category {
    pub id: u32,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Nominee {
    #[serde(default)]
    pub id: Option<u32>,
    pub name: String,
    /// Film title for acting categories, producers for Best Picture.
    #[serde(default)]
    pub more: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub winner: bool,
}

/// The three categories reported per year.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Award {
    BestPicture,
    LeadActor,
    LeadActress,
}

impl Award {
    fn category_name(self) -> &'static str {
        match self {
            Self::BestPicture => "best picture",
            Self::LeadActor => "actor in a leading role",
            Self::LeadActress => "actress in a leading role",
        }
    }

    /// Category names vary in case and prefix between editions.
    pub fn matches(self, category: &str) -> bool {
        category.to_lowercase().contains(self.category_name())
    }
}

pub struct AwardsClient {
    http: Client,
    api_url: String,
}

impl AwardsClient {
    pub fn new(http: Client) -> Self {
        Self {
            http,
            api_url: AWARDS_API_URL.to_string(),
        }
    }

    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }
}

#[async_trait]
impl AwardsSource for AwardsClient {
    async fn edition(&self, year: i32) -> Result<Option<Edition>> {
        let request = self
            .http
            .get(format!("{}/oscars/editions", self.api_url))
            .query(&[("year", year)]);
        let editions: Vec<Edition> = fetch_json(request, "oscars-editions").await?;
        Ok(editions.into_iter().next())
    }

    async fn categories(&self, edition_id: u32) -> Result<Vec<Category>> {
        let request = self.http.get(format!(
            "{}/oscars/editions/{edition_id}/categories",
            self.api_url
        ));
        fetch_json(request, "oscars-categories").await
    }

    async fn nominees(&self, edition_id: u32, category_id: u32) -> Result<Vec<Nominee>> {
        let request = self.http.get(format!(
            "{}/oscars/editions/{edition_id}/categories/{category_id}/nominees",
            self.api_url
        ));
        fetch_json(request, "oscars-nominees").await
    }
}
