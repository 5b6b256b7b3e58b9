//! Turns raw chart rankings into the enriched top-10 lists for a year.

use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::cache::YearCache;
use crate::music::{Artist, MusicMetadata, RankProvider, RankedArtist, RankedSong, Track};

pub const TOP_TRACKS_LIMIT: usize = 10;
pub const TOP_ARTISTS_LIMIT: usize = 10;
/// Top tracks kept per enriched artist.
pub const ARTIST_TOP_TRACKS_LIMIT: usize = 10;
const SOURCE: &str = "Wikipedia + Spotify";

/// Outcome of looking an item up in the metadata source.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "data", rename_all = "camelCase")]
pub enum Enrichment<T> {
    Matched(T),
    /// The lookup failed or found nothing; `placeholder` is built from the chart entry.
    Fallback { placeholder: T, reason: String },
}

impl<T> Enrichment<T> {
    /// The matched record, or the placeholder.
    pub fn record(&self) -> &T {
        match self {
            Self::Matched(record) => record,
            Self::Fallback { placeholder, .. } => placeholder,
        }
    }

    pub fn is_matched(&self) -> bool {
        matches!(self, Self::Matched(_))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedTrack {
    pub rank: u32,
    /// Chart credit line, e.g. `"Santana featuring Rob Thomas"`.
    pub participants: String,
    pub chart: RankedSong,
    pub track: Enrichment<Track>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedArtist {
    pub rank: u32,
    pub chart: RankedArtist,
    pub artist: Enrichment<Artist>,
    pub top_tracks: Vec<Track>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MusicYear {
    pub year: i32,
    pub top_tracks: Vec<EnrichedTrack>,
    pub top_artists: Vec<EnrichedArtist>,
    pub source: String,
}

impl MusicYear {
    pub fn empty(year: i32) -> Self {
        Self {
            year,
            top_tracks: Vec::new(),
            top_artists: Vec::new(),
            source: SOURCE.to_string(),
        }
    }
}

pub struct MusicService {
    ranks: Arc<dyn RankProvider>,
    metadata: Arc<dyn MusicMetadata>,
    concurrency: usize,
    cache: YearCache<MusicYear>,
}

impl MusicService {
    pub fn new(
        ranks: Arc<dyn RankProvider>,
        metadata: Arc<dyn MusicMetadata>,
        concurrency: usize,
        cache_ttl: Duration,
        cache_capacity: usize,
    ) -> Self {
        Self {
            ranks,
            metadata,
            concurrency: concurrency.max(1),
            cache: YearCache::new(cache_ttl, cache_capacity),
        }
    }

    /// Enriched top tracks and artists for `year`. Never fails; unmatched items fall back.
    pub async fn music_for_year(&self, year: i32) -> Arc<MusicYear> {
        let ranks = Arc::clone(&self.ranks);
        let metadata = Arc::clone(&self.metadata);
        let concurrency = self.concurrency;

        let Ok(music) = self
            .cache
            .get_or_load(year, move || async move {
                Ok(assemble(year, ranks, metadata, concurrency).await)
            })
            .await;
        music
    }
}

async fn assemble(
    year: i32,
    ranks: Arc<dyn RankProvider>,
    metadata: Arc<dyn MusicMetadata>,
    concurrency: usize,
) -> MusicYear {
    let (songs, artists) = tokio::join!(ranks.top_songs(year), ranks.top_artists(year));
    debug!(
        year,
        songs = songs.len(),
        artists = artists.len(),
        "chart rankings fetched"
    );

    let songs = dedupe_songs(songs);
    let artists = sort_artists(artists);

    // One limit across both lists caps in-flight metadata requests at `concurrency`.
    let limit = Semaphore::new(concurrency);
    let (top_tracks, top_artists) = tokio::join!(
        enrich_songs(metadata.as_ref(), &limit, songs, concurrency),
        enrich_artists(metadata.as_ref(), &limit, artists, concurrency)
    );

    info!(
        year,
        tracks = top_tracks.len(),
        tracks_matched = top_tracks.iter().filter(|t| t.track.is_matched()).count(),
        artists = top_artists.len(),
        artists_matched = top_artists.iter().filter(|a| a.artist.is_matched()).count(),
        "music enrichment complete"
    );

    MusicYear {
        year,
        top_tracks,
        top_artists,
        source: SOURCE.to_string(),
    }
}

/// Keep the first of each case-insensitive `(title, credit)` pair, then the top 10.
pub fn dedupe_songs(songs: Vec<RankedSong>) -> Vec<RankedSong> {
    let mut seen: HashSet<(String, String)> = HashSet::new();
    songs
        .into_iter()
        .filter(|song| seen.insert((song.title.to_lowercase(), song.display_name.to_lowercase())))
        .take(TOP_TRACKS_LIMIT)
        .collect()
}

/// Most chart credits first, earliest rank breaking ties, then the top 10.
pub fn sort_artists(mut artists: Vec<RankedArtist>) -> Vec<RankedArtist> {
    artists.sort_by(|a, b| {
        b.occurrences
            .cmp(&a.occurrences)
            .then_with(|| a.rank.cmp(&b.rank))
    });
    artists.truncate(TOP_ARTISTS_LIMIT);
    artists
}

/// Display rank for the item at `index` of the trimmed list.
fn display_rank(index: usize) -> u32 {
    u32::try_from(index).map_or(u32::MAX, |i| i.saturating_add(1))
}

async fn enrich_songs(
    metadata: &dyn MusicMetadata,
    limit: &Semaphore,
    songs: Vec<RankedSong>,
    concurrency: usize,
) -> Vec<EnrichedTrack> {
    stream::iter(songs.into_iter().enumerate())
        .map(|(index, song)| async move {
            let permit = limit.acquire().await;
            let lookup = metadata
                .search_track(&song.title, &song.primary_artist)
                .await;
            drop(permit);
            let track = match lookup {
                Ok(Some(track)) => Enrichment::Matched(track),
                Ok(None) => {
                    debug!(title = %song.title, artist = %song.primary_artist, "no track match");
                    Enrichment::Fallback {
                        placeholder: Track::placeholder(&song.title, &song.primary_artist),
                        reason: "no match".to_string(),
                    }
                }
                Err(e) => {
                    warn!(title = %song.title, error = ?e, "track lookup failed");
                    Enrichment::Fallback {
                        placeholder: Track::placeholder(&song.title, &song.primary_artist),
                        reason: format!("{e:#}"),
                    }
                }
            };
            EnrichedTrack {
                rank: display_rank(index),
                participants: song.display_name.clone(),
                chart: song,
                track,
            }
        })
        .buffered(concurrency)
        .collect()
        .await
}

async fn enrich_artists(
    metadata: &dyn MusicMetadata,
    limit: &Semaphore,
    artists: Vec<RankedArtist>,
    concurrency: usize,
) -> Vec<EnrichedArtist> {
    stream::iter(artists.into_iter().enumerate())
        .map(|(index, ranked)| async move {
            let permit = limit.acquire().await;
            let lookup = lookup_artist(metadata, &ranked.primary_artist).await;
            drop(permit);
            let (artist, top_tracks) = match lookup {
                Ok((artist, tracks)) => (Enrichment::Matched(artist), tracks),
                Err(reason) => (
                    Enrichment::Fallback {
                        placeholder: Artist::placeholder(&ranked.primary_artist),
                        reason,
                    },
                    Vec::new(),
                ),
            };
            EnrichedArtist {
                rank: display_rank(index),
                chart: ranked,
                artist,
                top_tracks,
            }
        })
        .buffered(concurrency)
        .collect()
        .await
}

/// Artist search followed by top tracks; any miss or failure is reported as the fallback reason.
async fn lookup_artist(
    metadata: &dyn MusicMetadata,
    name: &str,
) -> Result<(Artist, Vec<Track>), String> {
    let artist = match metadata.search_artist(name).await {
        Ok(Some(artist)) => artist,
        Ok(None) => {
            debug!(artist = name, "no artist match");
            return Err("no match".to_string());
        }
        Err(e) => {
            warn!(artist = name, error = ?e, "artist lookup failed");
            return Err(format!("{e:#}"));
        }
    };

    let Some(id) = artist.id.as_deref() else {
        return Ok((artist, Vec::new()));
    };

    match metadata.artist_top_tracks(id).await {
        Ok(mut tracks) => {
            tracks.truncate(ARTIST_TOP_TRACKS_LIMIT);
            Ok((artist, tracks))
        }
        Err(e) => {
            warn!(artist = name, error = ?e, "top tracks lookup failed");
            Err(format!("{e:#}"))
        }
    }
}
