//! Billboard year-end Hot 100 extraction from Wikipedia chart tables.
//!
//! The year-end pages are plain wikitables whose shape drifts between years:
//! the rank column is sometimes missing, and an artist with several charting
//! songs often appears once with `rowspan`. Parsing is lenient throughout and
//! a page that can't be read simply yields no rows.

use anyhow::Result;
use async_trait::async_trait;
use html_scraper::{ElementRef, Html, Selector};
use indexmap::IndexMap;
use regex::Regex;
use reqwest::Client;
use serde::Serialize;
use std::sync::LazyLock;
use tracing::{debug, warn};

use crate::http::fetch_text;
use crate::music::RankProvider;

const WIKI_BASE_URL: &str = "https://en.wikipedia.org/wiki";

static TABLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("table.wikitable").expect("valid selector"));
static ROW: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tr").expect("valid selector"));

static CITATION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[.*?\]").unwrap());
static RANK_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:#|no\.|rank|№)$").unwrap());
/// Separates the lead credit from featured guests.
static FEATURED_DELIMITER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s+(?:featuring|feat\.?|with)\s+").unwrap());
/// Separates co-lead artists within one credit segment.
static LEAD_DELIMITER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s+(?:&|and)\s+|\s*,\s*").unwrap());
static ANY_DELIMITER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\s+(?:featuring|feat\.?|with|&|and)\s+|\s*,\s*").unwrap()
});

/// A chart row: one song with its full artist credit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedSong {
    pub title: String,
    /// The artist cell as printed, e.g. `"Mark Ronson featuring Bruno Mars"`.
    pub display_name: String,
    pub primary_artist: String,
    pub rank: u32,
}

/// A lead artist aggregated over the whole chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedArtist {
    pub name: String,
    pub primary_artist: String,
    /// Rank of the first row the artist is credited on, lead or featured.
    pub rank: u32,
    /// Every credit on the chart, including featured appearances.
    pub occurrences: u32,
}

/// Column positions of a recognised chart table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChartColumns {
    pub artist: usize,
    pub title: usize,
    pub rank: Option<usize>,
    pub width: usize,
}

impl ChartColumns {
    /// Inspect the first row of `table`; `None` unless it has both an artist and a song/title header.
    pub fn detect(table: ElementRef<'_>) -> Option<Self> {
        let header = table.select(&ROW).next()?;
        let cells: Vec<String> = row_cells(header)
            .map(|cell| cell_text(cell).to_lowercase())
            .collect();

        let (mut artist, mut title, mut rank) = (None, None, None);
        for (i, text) in cells.iter().enumerate() {
            if text.contains("artist") {
                artist = Some(i);
            } else if text.contains("song") || text.contains("title") {
                title = Some(i);
            } else if RANK_HEADER.is_match(text) {
                rank = Some(i);
            }
        }

        Some(Self {
            artist: artist?,
            title: title?,
            rank,
            width: cells.len(),
        })
    }

    /// The row's chart position, falling back to `row_number` when absent or unreadable.
    fn rank_of(&self, cells: &[String], row_number: u32) -> u32 {
        self.rank
            .and_then(|i| cells.get(i))
            .map(|text| text.chars().filter(char::is_ascii_digit).collect::<String>())
            .and_then(|digits| digits.parse::<u32>().ok())
            .filter(|&rank| rank >= 1)
            .unwrap_or(row_number)
    }
}

struct Carried {
    text: String,
    remaining: usize,
}

/// Expands table rows into fixed-width cell vectors, repeating `rowspan` cells
/// into the rows they cover.
pub struct RowExpander<'a, I>
where
    I: Iterator<Item = ElementRef<'a>>,
{
    rows: I,
    carried: Vec<Option<Carried>>,
}

impl<'a, I> RowExpander<'a, I>
where
    I: Iterator<Item = ElementRef<'a>>,
{
    pub fn new(rows: I, width: usize) -> Self {
        Self {
            rows,
            carried: (0..width).map(|_| None).collect(),
        }
    }
}

impl<'a, I> Iterator for RowExpander<'a, I>
where
    I: Iterator<Item = ElementRef<'a>>,
{
    type Item = Vec<String>;

    fn next(&mut self) -> Option<Self::Item> {
        let row = self.rows.next()?;
        let mut cells = row_cells(row);
        let mut expanded = Vec::with_capacity(self.carried.len());

        for slot in self.carried.iter_mut() {
            if let Some(carry) = slot {
                expanded.push(carry.text.clone());
                carry.remaining -= 1;
                if carry.remaining == 0 {
                    *slot = None;
                }
                continue;
            }

            let Some(cell) = cells.next() else {
                expanded.push(String::new());
                continue;
            };
            let text = cell_text(cell);
            let span = cell
                .value()
                .attr("rowspan")
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(1);
            if span > 1 {
                *slot = Some(Carried {
                    text: text.clone(),
                    remaining: span - 1,
                });
            }
            expanded.push(text);
        }

        Some(expanded)
    }
}

/// Direct `th`/`td` children of a row, so nested tables don't leak cells.
fn row_cells<'a>(row: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> {
    row.children()
        .filter_map(ElementRef::wrap)
        .filter(|el| matches!(el.value().name(), "th" | "td"))
}

fn cell_text(cell: ElementRef<'_>) -> String {
    let text: String = cell.text().collect();
    clean_cell_text(&text)
}

/// Strip citation markers like `[12]` and normalise whitespace.
pub fn clean_cell_text(text: &str) -> String {
    let stripped = CITATION.replace_all(text, "");
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// First name in an artist credit, e.g. `"Ariana Grande & The Weeknd"` -> `"Ariana Grande"`.
pub fn primary_artist(credit: &str) -> String {
    ANY_DELIMITER
        .split(credit)
        .map(str::trim)
        .find(|name| !name.is_empty())
        .unwrap_or(credit.trim())
        .to_string()
}

fn trim_title_quotes(title: &str) -> &str {
    title
        .trim()
        .trim_start_matches(['"', '“'])
        .trim_end_matches(['"', '”'])
        .trim()
}

/// First wikitable that looks like a chart, with its body rows.
fn locate_chart(doc: &Html) -> Option<(ChartColumns, Vec<ElementRef<'_>>)> {
    doc.select(&TABLE).find_map(|table| {
        let columns = ChartColumns::detect(table)?;
        let body: Vec<_> = table.select(&ROW).skip(1).collect();
        Some((columns, body))
    })
}

/// Expanded body rows paired with their 1-based row number.
fn chart_rows(doc: &Html) -> Option<(ChartColumns, Vec<(u32, Vec<String>)>)> {
    let (columns, body) = locate_chart(doc)?;
    let rows = RowExpander::new(body.into_iter(), columns.width)
        .zip(1u32..)
        .map(|(cells, row_number)| (row_number, cells))
        .collect();
    Some((columns, rows))
}

pub fn extract_songs(doc: &Html) -> Vec<RankedSong> {
    let Some((columns, rows)) = chart_rows(doc) else {
        return Vec::new();
    };

    rows.into_iter()
        .filter_map(|(row_number, cells)| {
            let artist = cells.get(columns.artist)?.trim();
            let title = trim_title_quotes(cells.get(columns.title)?);
            if artist.is_empty() || title.is_empty() {
                return None;
            }
            Some(RankedSong {
                title: title.to_string(),
                display_name: artist.to_string(),
                primary_artist: primary_artist(artist),
                rank: columns.rank_of(&cells, row_number),
            })
        })
        .collect()
}

pub fn extract_artists(doc: &Html) -> Vec<RankedArtist> {
    let Some((columns, rows)) = chart_rows(doc) else {
        return Vec::new();
    };

    // Insertion order of `tally` is first-credit order; `leads` filters it down.
    let mut tally: IndexMap<String, (u32, u32)> = IndexMap::new();
    let mut leads: IndexMap<String, ()> = IndexMap::new();

    for (row_number, cells) in rows {
        let Some(credit) = cells.get(columns.artist).map(|c| c.trim()) else {
            continue;
        };
        if credit.is_empty() {
            continue;
        }
        let rank = columns.rank_of(&cells, row_number);

        for (segment_index, segment) in FEATURED_DELIMITER.split(credit).enumerate() {
            for name in LEAD_DELIMITER.split(segment).map(str::trim) {
                if name.is_empty() {
                    continue;
                }
                if segment_index == 0 {
                    leads.entry(name.to_string()).or_insert(());
                }
                let (_, count) = tally.entry(name.to_string()).or_insert((rank, 0));
                *count += 1;
            }
        }
    }

    leads
        .into_keys()
        .filter_map(|name| {
            let &(rank, occurrences) = tally.get(&name)?;
            Some(RankedArtist {
                primary_artist: name.clone(),
                name,
                rank,
                occurrences,
            })
        })
        .collect()
}

/// Fetches the year-end chart page from Wikipedia.
pub struct WikipediaChartClient {
    http: Client,
    base_url: String,
}

impl WikipediaChartClient {
    pub fn new(http: Client) -> Self {
        Self {
            http,
            base_url: WIKI_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    async fn fetch_page(&self, year: i32) -> Result<String> {
        let url = format!(
            "{}/Billboard_Year-End_Hot_100_singles_of_{year}",
            self.base_url
        );
        debug!(year, url = %url, "fetching year-end chart");
        fetch_text(self.http.get(&url), "wikipedia-chart").await
    }

    async fn parse_page<T>(&self, year: i32, parse: fn(&Html) -> Vec<T>) -> Vec<T> {
        match self.fetch_page(year).await {
            Ok(body) => {
                let rows = parse(&Html::parse_document(&body));
                if rows.is_empty() {
                    warn!(year, "no chart table found on year-end page");
                }
                rows
            }
            Err(e) => {
                warn!(year, error = ?e, "failed to fetch year-end chart");
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl RankProvider for WikipediaChartClient {
    async fn top_songs(&self, year: i32) -> Vec<RankedSong> {
        self.parse_page(year, extract_songs).await
    }

    async fn top_artists(&self, year: i32) -> Vec<RankedArtist> {
        self.parse_page(year, extract_artists).await
    }
}
