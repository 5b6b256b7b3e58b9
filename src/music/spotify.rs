//! Spotify Web API client for track and artist metadata.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::credentials::{SpotifyTokenSource, TokenCache, TokenSource};
use crate::http::fetch_json;
use crate::music::MusicMetadata;

const SPOTIFY_API_URL: &str = "https://api.spotify.com/v1";
const TOP_TRACKS_MARKET: &str = "US";

/// Track metadata as served to clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub id: Option<String>,
    pub name: String,
    pub popularity: u32,
    pub spotify_url: Option<String>,
    pub album: Album,
    pub artists: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Album {
    pub name: String,
    pub release_date: Option<String>,
    pub image_url: Option<String>,
}

/// Artist metadata as served to clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Artist {
    pub id: Option<String>,
    pub name: String,
    pub genres: Vec<String>,
    pub popularity: u32,
    pub followers: u64,
    pub spotify_url: Option<String>,
    pub image_url: Option<String>,
}

impl Track {
    /// Stand-in for a chart song Spotify couldn't match.
    pub fn placeholder(title: &str, primary_artist: &str) -> Self {
        Self {
            id: None,
            name: title.to_string(),
            popularity: 0,
            spotify_url: None,
            album: Album {
                name: "Unknown".to_string(),
                release_date: None,
                image_url: None,
            },
            artists: vec![primary_artist.to_string()],
        }
    }
}

impl Artist {
    /// Stand-in for a chart artist Spotify couldn't match.
    pub fn placeholder(name: &str) -> Self {
        Self {
            id: None,
            name: name.to_string(),
            genres: Vec::new(),
            popularity: 0,
            followers: 0,
            spotify_url: None,
            image_url: None,
        }
    }
}

// Wire shapes. Only the fields we surface are declared.

#[derive(Debug, Deserialize)]
struct TrackSearchResponse {
    tracks: Page<TrackItem>,
}

#[derive(Debug, Deserialize)]
struct ArtistSearchResponse {
    artists: Page<ArtistItem>,
}

#[derive(Debug, Deserialize)]
struct TopTracksResponse {
    tracks: Vec<TrackItem>,
}

#[derive(Debug, Deserialize)]
struct Page<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct TrackItem {
    id: Option<String>,
    name: String,
    #[serde(default)]
    popularity: u32,
    #[serde(default)]
    external_urls: ExternalUrls,
    album: Option<AlbumItem>,
    #[serde(default)]
    artists: Vec<ArtistRef>,
}

#[derive(Debug, Deserialize)]
struct AlbumItem {
    name: String,
    release_date: Option<String>,
    #[serde(default)]
    images: Vec<Image>,
}

#[derive(Debug, Deserialize)]
struct ArtistRef {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ArtistItem {
    id: Option<String>,
    name: String,
    #[serde(default)]
    genres: Vec<String>,
    #[serde(default)]
    popularity: u32,
    followers: Option<Followers>,
    #[serde(default)]
    external_urls: ExternalUrls,
    #[serde(default)]
    images: Vec<Image>,
}

#[derive(Debug, Default, Deserialize)]
struct ExternalUrls {
    spotify: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Followers {
    #[serde(default)]
    total: u64,
}

#[derive(Debug, Deserialize)]
struct Image {
    url: String,
}

impl From<TrackItem> for Track {
    fn from(item: TrackItem) -> Self {
        let album = item.album.map_or_else(
            || Album {
                name: "Unknown".to_string(),
                release_date: None,
                image_url: None,
            },
            |album| Album {
                name: album.name,
                release_date: album.release_date,
                // Spotify lists images largest first.
                image_url: album.images.into_iter().next().map(|i| i.url),
            },
        );
        Self {
            id: item.id,
            name: item.name,
            popularity: item.popularity,
            spotify_url: item.external_urls.spotify,
            album,
            artists: item.artists.into_iter().map(|a| a.name).collect(),
        }
    }
}

impl From<ArtistItem> for Artist {
    fn from(item: ArtistItem) -> Self {
        Self {
            id: item.id,
            name: item.name,
            genres: item.genres,
            popularity: item.popularity,
            followers: item.followers.map_or(0, |f| f.total),
            spotify_url: item.external_urls.spotify,
            image_url: item.images.into_iter().next().map(|i| i.url),
        }
    }
}

pub struct SpotifyClient {
    http: Client,
    api_url: String,
    tokens: TokenCache,
}

impl SpotifyClient {
    /// Client using the client-credentials grant for `client_id`/`client_secret`.
    pub fn new(http: Client, client_id: String, client_secret: String) -> Self {
        let source = SpotifyTokenSource::new(http.clone(), client_id, client_secret);
        Self::with_token_source(http, Arc::new(source))
    }

    pub fn with_token_source(http: Client, source: Arc<dyn TokenSource>) -> Self {
        Self {
            http,
            api_url: SPOTIFY_API_URL.to_string(),
            tokens: TokenCache::new(source),
        }
    }

    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    async fn search<T: serde::de::DeserializeOwned>(&self, query: &str, kind: &str) -> Result<T> {
        let token = self
            .tokens
            .get_token()
            .await
            .context("No Spotify access token")?;
        let request = self
            .http
            .get(format!("{}/search", self.api_url))
            .bearer_auth(token)
            .query(&[("q", query), ("type", kind), ("limit", "1")]);
        fetch_json(request, "spotify-search").await
    }
}

#[async_trait]
impl MusicMetadata for SpotifyClient {
    async fn search_track(&self, title: &str, artist: &str) -> Result<Option<Track>> {
        let query = format!("track:\"{title}\" artist:\"{artist}\"");
        let response: TrackSearchResponse = self.search(&query, "track").await?;
        Ok(response.tracks.items.into_iter().next().map(Track::from))
    }

    async fn search_artist(&self, name: &str) -> Result<Option<Artist>> {
        let query = format!("artist:\"{name}\"");
        let response: ArtistSearchResponse = self.search(&query, "artist").await?;
        Ok(response.artists.items.into_iter().next().map(Artist::from))
    }

    async fn artist_top_tracks(&self, artist_id: &str) -> Result<Vec<Track>> {
        let token = self
            .tokens
            .get_token()
            .await
            .context("No Spotify access token")?;
        let request = self
            .http
            .get(format!(
                "{}/artists/{}/top-tracks",
                self.api_url,
                urlencoding::encode(artist_id)
            ))
            .bearer_auth(token)
            .query(&[("market", TOP_TRACKS_MARKET)]);
        let response: TopTracksResponse = fetch_json(request, "spotify-top-tracks").await?;
        Ok(response.tracks.into_iter().map(Track::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::json::decode_json;

    #[test]
    fn test_track_item_conversion() {
        let body = r#"{
            "tracks": {"items": [{
                "id": "3n3Ppam7vgaVa1iaRUc9Lp",
                "name": "Mr. Brightside",
                "popularity": 85,
                "external_urls": {"spotify": "https://open.spotify.com/track/3n3P"},
                "album": {
                    "name": "Hot Fuss",
                    "release_date": "2004-06-07",
                    "images": [{"url": "https://i.scdn.co/large", "height": 640, "width": 640},
                               {"url": "https://i.scdn.co/small", "height": 64, "width": 64}]
                },
                "artists": [{"id": "0C0X", "name": "The Killers"}]
            }]}
        }"#;
        let response: TrackSearchResponse = decode_json(body).unwrap();
        let track = Track::from(response.tracks.items.into_iter().next().unwrap());

        assert_eq!(track.name, "Mr. Brightside");
        assert_eq!(track.album.image_url.as_deref(), Some("https://i.scdn.co/large"));
        assert_eq!(track.artists, vec!["The Killers".to_string()]);
        assert_eq!(
            track.spotify_url.as_deref(),
            Some("https://open.spotify.com/track/3n3P")
        );
    }

    #[test]
    fn test_artist_item_defaults() {
        let body = r#"{"artists": {"items": [{"id": "x", "name": "Obscure Band"}]}}"#;
        let response: ArtistSearchResponse = decode_json(body).unwrap();
        let artist = Artist::from(response.artists.items.into_iter().next().unwrap());

        assert_eq!(artist.followers, 0);
        assert!(artist.genres.is_empty());
        assert!(artist.image_url.is_none());
    }

    #[test]
    fn test_empty_search_page() {
        let response: TrackSearchResponse = decode_json(r#"{"tracks": {"items": []}}"#).unwrap();
        assert!(response.tracks.items.is_empty());
    }

    #[test]
    fn test_placeholders_keep_chart_names() {
        let track = Track::placeholder("Smooth", "Santana");
        assert_eq!(track.name, "Smooth");
        assert_eq!(track.album.name, "Unknown");
        assert_eq!(track.artists, vec!["Santana".to_string()]);

        let artist = Artist::placeholder("Santana");
        assert_eq!((artist.popularity, artist.followers), (0, 0));
    }
}
