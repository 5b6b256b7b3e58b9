//! Nobel prizes for a year, each laureate enriched with links, country and portrait.

use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::nobel::client::article_title;
use crate::nobel::{PortraitSource, PrizeSource};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Laureate {
    pub id: String,
    pub name: String,
    pub motivation: Option<String>,
    /// Share of the prize, e.g. `"1/2"`.
    pub portion: Option<String>,
    pub wikipedia_url: Option<String>,
    pub country: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Prize {
    pub category: String,
    pub category_full_name: String,
    pub laureates: Vec<Laureate>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LaureateDetails {
    pub wikipedia_url: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NobelYear {
    pub year: i32,
    pub prizes: Vec<Prize>,
}

impl NobelYear {
    pub fn empty(year: i32) -> Self {
        Self {
            year,
            prizes: Vec::new(),
        }
    }
}

pub struct NobelService {
    prizes: Arc<dyn PrizeSource>,
    portraits: Arc<dyn PortraitSource>,
    concurrency: usize,
}

impl NobelService {
    pub fn new(prizes: Arc<dyn PrizeSource>, portraits: Arc<dyn PortraitSource>, concurrency: usize) -> Self {
        Self {
            prizes,
            portraits,
            concurrency: concurrency.max(1),
        }
    }

    /// Prizes for `year`, laureates enriched in place. Never fails.
    pub async fn nobel_for_year(&self, year: i32) -> NobelYear {
        let mut prizes = match self.prizes.prizes(year).await {
            Ok(prizes) => prizes,
            Err(e) => {
                warn!(year, error = ?e, "failed to fetch Nobel prizes");
                return NobelYear::empty(year);
            }
        };

        // Flatten every laureate with its prize index so one bounded stream covers the year.
        let pending: Vec<(usize, Laureate)> = prizes
            .iter_mut()
            .enumerate()
            .flat_map(|(i, prize)| std::mem::take(&mut prize.laureates).into_iter().map(move |l| (i, l)))
            .collect();

        let enriched: Vec<(usize, Laureate)> = stream::iter(pending)
            .map(|(i, laureate)| async move { (i, self.enrich(laureate).await) })
            .buffered(self.concurrency)
            .collect()
            .await;

        for (i, laureate) in enriched {
            prizes[i].laureates.push(laureate);
        }

        debug!(year, prizes = prizes.len(), "Nobel prizes loaded");
        NobelYear { year, prizes }
    }

    async fn enrich(&self, mut laureate: Laureate) -> Laureate {
        match self.prizes.laureate_details(&laureate.id).await {
            Ok(Some(details)) => {
                laureate.wikipedia_url = details.wikipedia_url;
                laureate.country = details.country;
            }
            Ok(None) => return laureate,
            Err(e) => {
                warn!(laureate = %laureate.name, error = ?e, "laureate lookup failed");
                return laureate;
            }
        }

        let Some(title) = laureate.wikipedia_url.as_deref().and_then(article_title) else {
            return laureate;
        };
        match self.portraits.portrait(&title).await {
            Ok(image) => laureate.image_url = image,
            Err(e) => warn!(laureate = %laureate.name, error = ?e, "portrait lookup failed"),
        }
        laureate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use async_trait::async_trait;
    use std::time::Duration;

    fn laureate(id: &str, name: &str) -> Laureate {
        Laureate {
            id: id.to_string(),
            name: name.to_string(),
            motivation: None,
            portion: None,
            wikipedia_url: None,
            country: None,
            image_url: None,
        }
    }

    struct FakePrizes {
        fail: bool,
    }

    #[async_trait]
    impl PrizeSource for FakePrizes {
        async fn prizes(&self, _year: i32) -> Result<Vec<Prize>> {
            if self.fail {
                anyhow::bail!("nobel api down");
            }
            Ok(vec![
                Prize {
                    category: "Physics".to_string(),
                    category_full_name: "The Nobel Prize in Physics".to_string(),
                    laureates: vec![laureate("1", "Slow Person"), laureate("2", "Fast Person")],
                },
                Prize {
                    category: "Peace".to_string(),
                    category_full_name: "The Nobel Peace Prize".to_string(),
                    laureates: vec![laureate("3", "Broken Org"), laureate("4", "No Article")],
                },
            ])
        }

        async fn laureate_details(&self, id: &str) -> Result<Option<LaureateDetails>> {
            match id {
                "1" => {
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    Ok(Some(LaureateDetails {
                        wikipedia_url: Some("https://en.wikipedia.org/wiki/Slow_Person".to_string()),
                        country: Some("Sweden".to_string()),
                    }))
                }
                "2" => Ok(Some(LaureateDetails {
                    wikipedia_url: Some("https://en.wikipedia.org/wiki/Fast_Person".to_string()),
                    country: None,
                })),
                "3" => anyhow::bail!("laureate endpoint failed"),
                _ => Ok(Some(LaureateDetails::default())),
            }
        }
    }

    struct FakePortraits;

    #[async_trait]
    impl PortraitSource for FakePortraits {
        async fn portrait(&self, title: &str) -> Result<Option<String>> {
            if title == "Fast Person" {
                anyhow::bail!("pageimages failed");
            }
            Ok(Some(format!("https://upload/{title}.jpg")))
        }
    }

    fn service(fail: bool) -> NobelService {
        NobelService::new(Arc::new(FakePrizes { fail }), Arc::new(FakePortraits), 4)
    }

    #[tokio::test(start_paused = true)]
    async fn test_laureates_enriched_in_order() {
        let result = service(false).nobel_for_year(2020).await;

        let physics = &result.prizes[0].laureates;
        let names: Vec<_> = physics.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["Slow Person", "Fast Person"], "order follows the prize listing");
        assert_eq!(physics[0].country.as_deref(), Some("Sweden"));
        assert_eq!(physics[0].image_url.as_deref(), Some("https://upload/Slow Person.jpg"));
        assert_eq!(physics[1].image_url, None, "portrait failure keeps the laureate");
        assert!(physics[1].wikipedia_url.is_some());
    }

    #[tokio::test]
    async fn test_failed_lookups_keep_laureate() {
        let result = service(false).nobel_for_year(2020).await;

        let peace = &result.prizes[1].laureates;
        assert_eq!(peace.len(), 2);
        assert_eq!(peace[0], laureate("3", "Broken Org"));
        assert_eq!(peace[1], laureate("4", "No Article"));
    }

    #[tokio::test]
    async fn test_failed_prize_fetch_is_empty() {
        let result = service(true).nobel_for_year(2020).await;
        assert_eq!(result, NobelYear::empty(2020));
    }
}
