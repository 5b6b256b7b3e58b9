//! Nobel Prize API v2.1 and Wikipedia portrait lookups.

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use url::Url;

use crate::http::fetch_json;
use crate::nobel::{Laureate, LaureateDetails, PortraitSource, Prize, PrizeSource};

const NOBEL_API_URL: &str = "https://api.nobelprize.org/2.1";
const WIKIPEDIA_API_URL: &str = "https://en.wikipedia.org/w/api.php";
const PORTRAIT_SIZE: &str = "300";

/// `{"en": "...", "se": "..."}`; only English is read.
#[derive(Debug, Default, Deserialize)]
struct Localized {
    #[serde(default)]
    en: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PrizesResponse {
    #[serde(default)]
    nobel_prizes: Vec<PrizeItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PrizeItem {
    #[serde(default)]
    category: Localized,
    #[serde(default)]
    category_full_name: Localized,
    #[serde(default)]
    laureates: Vec<LaureateItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LaureateItem {
    id: String,
    /// Persons carry `knownName`, organisations `orgName`.
    known_name: Option<Localized>,
    org_name: Option<Localized>,
    motivation: Option<Localized>,
    portion: Option<String>,
}

impl From<LaureateItem> for Laureate {
    fn from(item: LaureateItem) -> Self {
        let name = item
            .known_name
            .or(item.org_name)
            .map(|n| n.en)
            .unwrap_or_default();
        Self {
            id: item.id,
            name,
            motivation: item.motivation.map(|m| m.en).filter(|m| !m.is_empty()),
            portion: item.portion,
            wikipedia_url: None,
            country: None,
            image_url: None,
        }
    }
}

impl From<PrizeItem> for Prize {
    fn from(item: PrizeItem) -> Self {
        Self {
            category: item.category.en,
            category_full_name: item.category_full_name.en,
            laureates: item.laureates.into_iter().map(Laureate::from).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct LaureatesResponse {
    #[serde(default)]
    laureates: Vec<LaureateDetailItem>,
}

#[derive(Debug, Deserialize)]
struct LaureateDetailItem {
    wikipedia: Option<WikipediaLinks>,
    birth: Option<Event>,
    /// Organisations have a founding place instead of a birth place.
    founded: Option<Event>,
}

#[derive(Debug, Deserialize)]
struct WikipediaLinks {
    english: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Event {
    place: Option<Place>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Place {
    country_now: Option<Localized>,
}

impl Event {
    fn country(self) -> Option<String> {
        self.place?.country_now.map(|c| c.en).filter(|c| !c.is_empty())
    }
}

pub struct NobelClient {
    http: Client,
    api_url: String,
}

impl NobelClient {
    pub fn new(http: Client) -> Self {
        Self {
            http,
            api_url: NOBEL_API_URL.to_string(),
        }
    }

    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }
}

#[async_trait]
impl PrizeSource for NobelClient {
    async fn prizes(&self, year: i32) -> Result<Vec<Prize>> {
        let request = self
            .http
            .get(format!("{}/nobelPrizes", self.api_url))
            .query(&[("nobelPrizeYear", year)]);
        let response: PrizesResponse = fetch_json(request, "nobel-prizes").await?;
        Ok(response.nobel_prizes.into_iter().map(Prize::from).collect())
    }

    async fn laureate_details(&self, id: &str) -> Result<Option<LaureateDetails>> {
        let request = self
            .http
            .get(format!("{}/laureates", self.api_url))
            .query(&[("ID", id)]);
        let response: LaureatesResponse = fetch_json(request, "nobel-laureate").await?;
        Ok(response.laureates.into_iter().next().map(|item| {
            let country = item
                .birth
                .and_then(Event::country)
                .or_else(|| item.founded.and_then(Event::country));
            LaureateDetails {
                wikipedia_url: item.wikipedia.and_then(|w| w.english).filter(|u| !u.is_empty()),
                country,
            }
        }))
    }
}

/// Article title from an English Wikipedia URL, e.g. `.../wiki/Marie_Curie` -> `Marie Curie`.
pub fn article_title(wikipedia_url: &str) -> Option<String> {
    let url = Url::parse(wikipedia_url).ok()?;
    let mut segments = url.path_segments()?;
    if segments.next()? != "wiki" {
        return None;
    }
    let raw = segments.next().filter(|s| !s.is_empty())?;
    let decoded = urlencoding::decode(raw).ok()?;
    Some(decoded.replace('_', " "))
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    query: Option<PagesQuery>,
}

#[derive(Debug, Deserialize)]
struct PagesQuery {
    #[serde(default)]
    pages: Vec<Page>,
}

#[derive(Debug, Deserialize)]
struct Page {
    thumbnail: Option<Thumbnail>,
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
    source: String,
}

pub struct WikipediaImageClient {
    http: Client,
    api_url: String,
}

impl WikipediaImageClient {
    pub fn new(http: Client) -> Self {
        Self {
            http,
            api_url: WIKIPEDIA_API_URL.to_string(),
        }
    }

    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }
}

#[async_trait]
impl PortraitSource for WikipediaImageClient {
    async fn portrait(&self, title: &str) -> Result<Option<String>> {
        let request = self.http.get(&self.api_url).query(&[
            ("action", "query"),
            ("prop", "pageimages"),
            ("piprop", "thumbnail"),
            ("pithumbsize", PORTRAIT_SIZE),
            ("titles", title),
            ("redirects", "1"),
            ("format", "json"),
            ("formatversion", "2"),
        ]);
        let response: QueryResponse = fetch_json(request, "wikipedia-pageimages").await?;
        Ok(response
            .query
            .into_iter()
            .flat_map(|q| q.pages)
            .find_map(|page| page.thumbnail.map(|t| t.source)))
    }
}
