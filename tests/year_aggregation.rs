//! Composite year overview: caching, branch isolation and failure handling.

use async_trait::async_trait;
use indexmap::IndexMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use wikicap::entertainment::EntertainmentYear;
use wikicap::events::{EventItem, EventsYear};
use wikicap::music::MusicYear;
use wikicap::nobel::{NobelYear, Prize};
use wikicap::year::{
    AggregateError, EntertainmentProvider, EventsProvider, MusicProvider, NobelProvider,
    Providers, YearAggregator,
};

const TTL: Duration = Duration::from_secs(12 * 60 * 60);

#[derive(Default)]
struct Stub {
    calls: AtomicUsize,
    delay: Option<Duration>,
    panic_once: AtomicBool,
}

impl Stub {
    fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    fn panicking_once() -> Self {
        Self {
            panic_once: AtomicBool::new(true),
            ..Self::default()
        }
    }

    async fn hit(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.panic_once.swap(false, Ordering::SeqCst) {
            panic!("provider contract violated");
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MusicProvider for Stub {
    async fn music(&self, year: i32) -> MusicYear {
        self.hit().await;
        MusicYear {
            source: "stub chart".to_string(),
            ..MusicYear::empty(year)
        }
    }
}

#[async_trait]
impl EntertainmentProvider for Stub {
    async fn entertainment(&self, year: i32) -> EntertainmentYear {
        self.hit().await;
        EntertainmentYear::empty(year)
    }
}

#[async_trait]
impl EventsProvider for Stub {
    async fn events(&self, year: i32) -> EventsYear {
        self.hit().await;
        let mut events_by_month = IndexMap::new();
        events_by_month.insert(
            "January".to_string(),
            vec![EventItem {
                date: "Jan 1".to_string(),
                description: "The euro is introduced.".to_string(),
            }],
        );
        EventsYear {
            events_by_month,
            ..EventsYear::empty(year)
        }
    }
}

#[async_trait]
impl NobelProvider for Stub {
    async fn nobel(&self, year: i32) -> NobelYear {
        self.hit().await;
        NobelYear {
            year,
            prizes: vec![Prize {
                category: "Physics".to_string(),
                category_full_name: "The Nobel Prize in Physics".to_string(),
                laureates: Vec::new(),
            }],
        }
    }
}

struct Harness {
    music: Arc<Stub>,
    entertainment: Arc<Stub>,
    events: Arc<Stub>,
    nobel: Arc<Stub>,
    aggregator: YearAggregator,
}

impl Harness {
    fn new(events: Stub, nobel: Stub, branch_timeout: Duration) -> Self {
        let music = Arc::new(Stub::default());
        let entertainment = Arc::new(Stub::default());
        let events = Arc::new(events);
        let nobel = Arc::new(nobel);
        let providers = Providers {
            music: music.clone(),
            entertainment: entertainment.clone(),
            events: events.clone(),
            nobel: nobel.clone(),
        };
        Self {
            music,
            entertainment,
            events,
            nobel,
            aggregator: YearAggregator::new(providers, branch_timeout, TTL, 200),
        }
    }

    fn standard() -> Self {
        Self::new(Stub::default(), Stub::default(), Duration::from_secs(30))
    }

    fn calls(&self) -> [usize; 4] {
        [
            self.music.calls(),
            self.entertainment.calls(),
            self.events.calls(),
            self.nobel.calls(),
        ]
    }
}

#[tokio::test]
async fn test_second_request_within_ttl_is_cached() {
    let harness = Harness::standard();

    let first = harness.aggregator.get_year(1999).await.unwrap();
    let second = harness.aggregator.get_year(1999).await.unwrap();

    assert!(Arc::ptr_eq(&first, &second), "cached value should be shared");
    assert_eq!(harness.calls(), [1, 1, 1, 1], "each branch fetched once");
    assert_eq!(first.year, 1999);
    assert_eq!(first.music.source, "stub chart");
    assert_eq!(first.nobel.prizes.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_expired_entry_is_refetched() {
    let harness = Harness::standard();

    harness.aggregator.get_year(1999).await.unwrap();
    tokio::time::advance(TTL - Duration::from_secs(1)).await;
    harness.aggregator.get_year(1999).await.unwrap();
    assert_eq!(harness.calls(), [1, 1, 1, 1]);

    tokio::time::advance(Duration::from_secs(2)).await;
    harness.aggregator.get_year(1999).await.unwrap();
    assert_eq!(harness.calls(), [2, 2, 2, 2], "expired year should be rebuilt");
}

#[tokio::test]
async fn test_years_are_cached_independently() {
    let harness = Harness::standard();

    let a = harness.aggregator.get_year(1969).await.unwrap();
    let b = harness.aggregator.get_year(1970).await.unwrap();

    assert_eq!((a.year, b.year), (1969, 1970));
    assert_eq!(harness.calls(), [2, 2, 2, 2]);
    assert!(harness.aggregator.cached(1969).is_some());
    assert!(harness.aggregator.cached(1971).is_none());
}

#[tokio::test]
async fn test_concurrent_requests_share_one_build() {
    let harness = Harness::standard();

    let results = futures::future::join_all((0..10).map(|_| harness.aggregator.get_year(2001))).await;

    assert!(results.iter().all(|r| r.is_ok()));
    assert_eq!(harness.calls(), [1, 1, 1, 1], "concurrent misses should coalesce");
}

#[tokio::test(start_paused = true)]
async fn test_slow_branch_times_out_to_empty() {
    let harness = Harness::new(
        Stub::slow(Duration::from_secs(60)),
        Stub::default(),
        Duration::from_secs(5),
    );

    let overview = harness.aggregator.get_year(1989).await.unwrap();

    assert_eq!(overview.events, EventsYear::empty(1989), "timed-out branch uses its empty value");
    assert_eq!(overview.music.source, "stub chart", "other branches are unaffected");
    assert_eq!(overview.nobel.prizes.len(), 1);
}

#[tokio::test]
async fn test_panicking_branch_fails_request_without_caching() {
    let harness = Harness::new(Stub::default(), Stub::panicking_once(), Duration::from_secs(30));

    let err = harness.aggregator.get_year(2004).await.unwrap_err();
    let AggregateError::BranchFailed { branch, .. } = &err;
    assert_eq!(*branch, "nobel");
    assert!(harness.aggregator.cached(2004).is_none(), "failures are not cached");

    let overview = harness.aggregator.get_year(2004).await.unwrap();
    assert_eq!(overview.nobel.prizes.len(), 1);
    assert_eq!(harness.calls(), [2, 2, 2, 2], "retry rebuilds every branch");
}
