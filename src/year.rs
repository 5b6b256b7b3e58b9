//! The composite year overview: every subsystem fanned out concurrently and cached per year.

use async_trait::async_trait;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinError;
use tracing::{debug, error, info, warn};

use crate::cache::YearCache;
use crate::entertainment::{EntertainmentService, EntertainmentYear};
use crate::events::{EventService, EventsYear};
use crate::music::{MusicService, MusicYear};
use crate::nobel::{NobelService, NobelYear};
use crate::utils::{fmt_duration, log_if_slow};

/// Composite requests slower than this are logged at `warn`.
const SLOW_OVERVIEW: Duration = Duration::from_secs(10);

#[async_trait]
pub trait MusicProvider: Send + Sync {
    async fn music(&self, year: i32) -> MusicYear;
}

#[async_trait]
pub trait EntertainmentProvider: Send + Sync {
    async fn entertainment(&self, year: i32) -> EntertainmentYear;
}

#[async_trait]
pub trait EventsProvider: Send + Sync {
    async fn events(&self, year: i32) -> EventsYear;
}

#[async_trait]
pub trait NobelProvider: Send + Sync {
    async fn nobel(&self, year: i32) -> NobelYear;
}

#[async_trait]
impl MusicProvider for MusicService {
    async fn music(&self, year: i32) -> MusicYear {
        MusicYear::clone(&*self.music_for_year(year).await)
    }
}

#[async_trait]
impl EntertainmentProvider for EntertainmentService {
    async fn entertainment(&self, year: i32) -> EntertainmentYear {
        self.entertainment_for_year(year).await
    }
}

#[async_trait]
impl EventsProvider for EventService {
    async fn events(&self, year: i32) -> EventsYear {
        self.events_for_year(year).await
    }
}

#[async_trait]
impl NobelProvider for NobelService {
    async fn nobel(&self, year: i32) -> NobelYear {
        self.nobel_for_year(year).await
    }
}

/// The four subsystems behind one aggregator.
#[derive(Clone)]
pub struct Providers {
    pub music: Arc<dyn MusicProvider>,
    pub entertainment: Arc<dyn EntertainmentProvider>,
    pub events: Arc<dyn EventsProvider>,
    pub nobel: Arc<dyn NobelProvider>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearOverview {
    pub year: i32,
    pub music: MusicYear,
    pub entertainment: EntertainmentYear,
    pub events: EventsYear,
    pub nobel: NobelYear,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AggregateError {
    #[error("{branch} branch failed: {message}")]
    BranchFailed { branch: &'static str, message: String },
}

pub struct YearAggregator {
    providers: Providers,
    branch_timeout: Duration,
    cache: YearCache<YearOverview, AggregateError>,
}

impl YearAggregator {
    pub fn new(providers: Providers, branch_timeout: Duration, cache_ttl: Duration, cache_capacity: usize) -> Self {
        Self {
            providers,
            branch_timeout,
            cache: YearCache::new(cache_ttl, cache_capacity),
        }
    }

    pub fn providers(&self) -> &Providers {
        &self.providers
    }

    /// The cached overview for `year`, without triggering a load.
    pub fn cached(&self, year: i32) -> Option<Arc<YearOverview>> {
        self.cache.get(year)
    }

    /// The full overview for `year`, served from cache when fresh.
    ///
    /// Branch errors and timeouts degrade to that branch's empty value; only a
    /// panicking branch fails the request, and such failures are not cached.
    pub async fn get_year(&self, year: i32) -> Result<Arc<YearOverview>, AggregateError> {
        let providers = self.providers.clone();
        let timeout = self.branch_timeout;
        self.cache
            .get_or_load(year, move || assemble(year, providers, timeout))
            .await
    }
}

async fn assemble(year: i32, providers: Providers, timeout: Duration) -> Result<YearOverview, AggregateError> {
    let start = Instant::now();
    info!(year, "building year overview");

    let Providers {
        music,
        entertainment,
        events,
        nobel,
    } = providers;

    let music = spawn_branch("music", timeout, MusicYear::empty(year), async move {
        music.music(year).await
    });
    let entertainment = spawn_branch(
        "entertainment",
        timeout,
        EntertainmentYear::empty(year),
        async move { entertainment.entertainment(year).await },
    );
    let events = spawn_branch("events", timeout, EventsYear::empty(year), async move {
        events.events(year).await
    });
    let nobel = spawn_branch("nobel", timeout, NobelYear::empty(year), async move {
        nobel.nobel(year).await
    });

    let (music, entertainment, events, nobel) = tokio::join!(music, entertainment, events, nobel);
    let overview = YearOverview {
        year,
        music: joined("music", music)?,
        entertainment: joined("entertainment", entertainment)?,
        events: joined("events", events)?,
        nobel: joined("nobel", nobel)?,
    };

    log_if_slow(start, SLOW_OVERVIEW, "year-overview");
    debug!(year, duration = fmt_duration(start.elapsed()), "year overview built");
    Ok(overview)
}

/// Run one branch as its own task, substituting `empty` if it outlives `timeout`.
fn spawn_branch<T, F>(
    branch: &'static str,
    timeout: Duration,
    empty: T,
    work: F,
) -> tokio::task::JoinHandle<T>
where
    T: Send + 'static,
    F: Future<Output = T> + Send + 'static,
{
    tokio::spawn(async move {
        match tokio::time::timeout(timeout, work).await {
            Ok(value) => value,
            Err(_) => {
                warn!(branch, timeout = fmt_duration(timeout), "branch timed out, using empty result");
                empty
            }
        }
    })
}

fn joined<T>(branch: &'static str, result: Result<T, JoinError>) -> Result<T, AggregateError> {
    result.map_err(|e| {
        error!(branch, error = %e, "branch task failed");
        AggregateError::BranchFailed {
            branch,
            message: e.to_string(),
        }
    })
}
