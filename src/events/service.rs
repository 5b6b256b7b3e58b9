//! Month-by-month notable events for a year, from the Wikipedia year article.

use anyhow::Result;
use futures::stream::{self, StreamExt};
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::events::cleaner::clean_line;
use crate::events::{EventSource, TocItem};

pub const EVENTS_PER_MONTH: usize = 6;
pub const MAX_EVENT_CHARS: usize = 200;
/// Month sections fetched at once.
pub const SECTION_CONCURRENCY: usize = 4;
const SOURCE: &str = "Wikipedia (MediaWiki API)";

pub const MONTHS: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventItem {
    /// `"Jan 5"`, or the month name when the line carried no date.
    pub date: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventsYear {
    pub year: i32,
    /// Calendar-ordered; months without events are absent.
    pub events_by_month: IndexMap<String, Vec<EventItem>>,
    pub source: String,
}

impl EventsYear {
    pub fn empty(year: i32) -> Self {
        Self {
            year,
            events_by_month: IndexMap::new(),
            source: SOURCE.to_string(),
        }
    }
}

pub struct EventService {
    source: Arc<dyn EventSource>,
    timeout: Duration,
}

impl EventService {
    pub fn new(source: Arc<dyn EventSource>, timeout: Duration) -> Self {
        Self { source, timeout }
    }

    /// Events grouped by month. Slow or failing upstreams yield an empty result.
    pub async fn events_for_year(&self, year: i32) -> EventsYear {
        match tokio::time::timeout(self.timeout, self.collect(year)).await {
            Ok(Ok(events_by_month)) => EventsYear {
                year,
                events_by_month,
                source: SOURCE.to_string(),
            },
            Ok(Err(e)) => {
                warn!(year, error = ?e, "failed to load year events");
                EventsYear::empty(year)
            }
            Err(_) => {
                warn!(year, timeout = ?self.timeout, "year events timed out");
                EventsYear::empty(year)
            }
        }
    }

    async fn collect(&self, year: i32) -> Result<IndexMap<String, Vec<EventItem>>> {
        let toc = self.source.table_of_contents(year).await?;
        let sections = locate_month_sections(&toc);
        debug!(year, months = sections.len(), "located month sections");

        let source = self.source.as_ref();
        let fetched: Vec<(String, Vec<EventItem>)> = stream::iter(sections)
            .map(|(month, index)| async move {
                match source.section_wikitext(year, &index).await {
                    Ok(wikitext) => {
                        let events = month_events(&wikitext, &month);
                        (month, events)
                    }
                    Err(e) => {
                        warn!(year, month = %month, error = ?e, "failed to fetch month section");
                        (month, Vec::new())
                    }
                }
            })
            .buffer_unordered(SECTION_CONCURRENCY)
            .collect()
            .await;

        let mut by_month: HashMap<String, Vec<EventItem>> = fetched
            .into_iter()
            .filter(|(_, events)| !events.is_empty())
            .collect();

        Ok(MONTHS
            .iter()
            .filter_map(|month| by_month.remove_entry(*month))
            .collect())
    }
}

fn is_month(line: &str) -> bool {
    MONTHS.iter().any(|month| *month == line)
}

/// Month headings and their section indices, preferring those nested under "Events".
pub fn locate_month_sections(toc: &[TocItem]) -> IndexMap<String, String> {
    let mut months = IndexMap::new();

    let events_heading = toc.iter().position(|item| {
        item.line
            .trim()
            .to_lowercase()
            .starts_with("events")
    });

    if let Some(start) = events_heading
        && let Some(events_level) = toc[start].level
    {
        for item in &toc[start + 1..] {
            if item.level.is_some_and(|level| level <= events_level) {
                break;
            }
            let line = item.line.trim();
            if is_month(line) {
                months.insert(line.to_string(), item.index.trim().to_string());
            }
        }
    }

    if months.is_empty() {
        for item in toc {
            let line = item.line.trim();
            if is_month(line) {
                months.insert(line.to_string(), item.index.trim().to_string());
            }
        }
    }

    months
}

/// First [`EVENTS_PER_MONTH`] usable bullet lines of a month section.
pub fn month_events(wikitext: &str, month: &str) -> Vec<EventItem> {
    wikitext
        .lines()
        .filter_map(|line| clean_line(line, false, MAX_EVENT_CHARS))
        .filter(|cleaned| !cleaned.description.trim().is_empty())
        .take(EVENTS_PER_MONTH)
        .map(|cleaned| EventItem {
            date: if cleaned.date.is_empty() {
                month.to_string()
            } else {
                cleaned.date
            },
            description: cleaned.description,
        })
        .collect()
}
