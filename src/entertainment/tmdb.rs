//! The Movie Database (TMDB) v3 client.

use anyhow::Result;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};

use crate::entertainment::Catalog;
use crate::entertainment::scoring::Scorable;
use crate::http::fetch_json;

const TMDB_API_URL: &str = "https://api.themoviedb.org/3";
const TMDB_IMAGE_URL: &str = "https://image.tmdb.org/t/p/w500";

/// Minimum vote average and count for discover results.
const MIN_VOTE_AVERAGE: &str = "7";
const MIN_VOTE_COUNT: &str = "1000";

/// A movie or TV series. Series report their name as `title` and first air date as `release_date`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Title {
    pub id: u64,
    pub title: String,
    pub overview: Option<String>,
    pub poster_url: Option<String>,
    pub release_date: Option<String>,
    pub popularity: Option<f64>,
    pub vote_average: Option<f64>,
    pub vote_count: Option<u32>,
}

impl Scorable for Title {
    fn popularity(&self) -> Option<f64> {
        self.popularity
    }

    fn rating(&self) -> Option<f64> {
        self.vote_average
    }

    fn first_date(&self) -> Option<&str> {
        self.release_date.as_deref()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    pub id: u64,
    pub name: String,
    pub known_for_department: Option<String>,
    pub profile_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Paged<T> {
    #[serde(default = "Vec::new")]
    results: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct MovieItem {
    id: u64,
    #[serde(default)]
    title: String,
    overview: Option<String>,
    poster_path: Option<String>,
    release_date: Option<String>,
    popularity: Option<f64>,
    vote_average: Option<f64>,
    vote_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct SeriesItem {
    id: u64,
    #[serde(default)]
    name: String,
    overview: Option<String>,
    poster_path: Option<String>,
    first_air_date: Option<String>,
    popularity: Option<f64>,
    vote_average: Option<f64>,
    vote_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct PersonItem {
    id: u64,
    name: String,
    known_for_department: Option<String>,
    profile_path: Option<String>,
}

/// Absolute image URL for a TMDB `*_path`; blank paths are treated as missing.
fn image_url(path: Option<String>) -> Option<String> {
    path.filter(|p| !p.trim().is_empty())
        .map(|p| format!("{TMDB_IMAGE_URL}{p}"))
}

/// TMDB sends `""` for unknown dates.
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl From<MovieItem> for Title {
    fn from(item: MovieItem) -> Self {
        Self {
            id: item.id,
            title: item.title,
            overview: non_empty(item.overview),
            poster_url: image_url(item.poster_path),
            release_date: non_empty(item.release_date),
            popularity: item.popularity,
            vote_average: item.vote_average,
            vote_count: item.vote_count,
        }
    }
}

impl From<SeriesItem> for Title {
    fn from(item: SeriesItem) -> Self {
        Self {
            id: item.id,
            title: item.name,
            overview: non_empty(item.overview),
            poster_url: image_url(item.poster_path),
            release_date: non_empty(item.first_air_date),
            popularity: item.popularity,
            vote_average: item.vote_average,
            vote_count: item.vote_count,
        }
    }
}

impl From<PersonItem> for Person {
    fn from(item: PersonItem) -> Self {
        Self {
            id: item.id,
            name: item.name,
            known_for_department: item.known_for_department,
            profile_url: image_url(item.profile_path),
        }
    }
}

pub struct TmdbClient {
    http: Client,
    api_url: String,
    /// v4 read access token, sent as a bearer token.
    token: String,
}

impl TmdbClient {
    pub fn new(http: Client, token: String) -> Self {
        Self {
            http,
            api_url: TMDB_API_URL.to_string(),
            token,
        }
    }

    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    fn get(&self, path: &str) -> Result<RequestBuilder> {
        if self.token.is_empty() {
            anyhow::bail!("TMDB API key is not configured");
        }
        Ok(self
            .http
            .get(format!("{}{path}", self.api_url))
            .bearer_auth(&self.token))
    }
}

#[async_trait]
impl Catalog for TmdbClient {
    async fn discover_movies(&self, year: i32) -> Result<Vec<Title>> {
        let request = self.get("/discover/movie")?.query(&[
            ("primary_release_year", year.to_string().as_str()),
            ("sort_by", "vote_count.desc"),
            ("vote_average.gte", MIN_VOTE_AVERAGE),
            ("vote_count.gte", MIN_VOTE_COUNT),
        ]);
        let page: Paged<MovieItem> = fetch_json(request, "tmdb-discover-movie").await?;
        Ok(page.results.into_iter().map(Title::from).collect())
    }

    async fn discover_series(&self, year: i32) -> Result<Vec<Title>> {
        let (from, to) = (format!("{year}-01-01"), format!("{year}-12-31"));
        let request = self.get("/discover/tv")?.query(&[
            ("air_date.gte", from.as_str()),
            ("air_date.lte", to.as_str()),
            ("sort_by", "popularity.desc"),
            ("vote_average.gte", MIN_VOTE_AVERAGE),
            ("vote_count.gte", MIN_VOTE_COUNT),
            ("include_null_first_air_dates", "false"),
        ]);
        let page: Paged<SeriesItem> = fetch_json(request, "tmdb-discover-tv").await?;
        Ok(page.results.into_iter().map(Title::from).collect())
    }

    async fn search_movie(&self, title: &str) -> Result<Option<Title>> {
        let request = self
            .get("/search/movie")?
            .query(&[("query", title), ("include_adult", "false")]);
        let page: Paged<MovieItem> = fetch_json(request, "tmdb-search-movie").await?;
        Ok(page.results.into_iter().next().map(Title::from))
    }

    async fn search_person(&self, name: &str) -> Result<Option<Person>> {
        let request = self
            .get("/search/person")?
            .query(&[("query", name), ("include_adult", "false")]);
        let page: Paged<PersonItem> = fetch_json(request, "tmdb-search-person").await?;
        Ok(page.results.into_iter().next().map(Person::from))
    }
}
