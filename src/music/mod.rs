//! Year-end chart music: Wikipedia rankings enriched with Spotify metadata.

pub mod chart;
pub mod service;
pub mod spotify;

use anyhow::Result;
use async_trait::async_trait;

pub use chart::{RankedArtist, RankedSong, WikipediaChartClient};
pub use service::{EnrichedArtist, EnrichedTrack, Enrichment, MusicService, MusicYear};
pub use spotify::{Album, Artist, SpotifyClient, Track};

/// Source of ranked chart entries for a year. Failures surface as empty lists.
#[async_trait]
pub trait RankProvider: Send + Sync {
    async fn top_songs(&self, year: i32) -> Vec<RankedSong>;
    async fn top_artists(&self, year: i32) -> Vec<RankedArtist>;
}

/// Lookup of track and artist metadata. Searches yield at most one match.
#[async_trait]
pub trait MusicMetadata: Send + Sync {
    async fn search_track(&self, title: &str, artist: &str) -> Result<Option<Track>>;
    async fn search_artist(&self, name: &str) -> Result<Option<Artist>>;
    async fn artist_top_tracks(&self, artist_id: &str) -> Result<Vec<Track>>;
}
