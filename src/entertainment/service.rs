//! Movies, TV series and Academy Award winners for a year.

use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::entertainment::awards::{Award, Category, Edition, Nominee};
use crate::entertainment::scoring::{TOP_TITLES, rank_top};
use crate::entertainment::tmdb::Title;
use crate::entertainment::{AwardsSource, Catalog};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActingWinner {
    pub name: String,
    pub movie: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PictureWinner {
    pub title: String,
    pub producers: Option<String>,
    pub poster_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AcademyAwards {
    pub edition: Option<Edition>,
    pub best_picture: Option<PictureWinner>,
    pub best_actor: Option<ActingWinner>,
    pub best_actress: Option<ActingWinner>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntertainmentYear {
    pub year: i32,
    pub movies: Vec<Title>,
    pub series: Vec<Title>,
    pub academy_awards: AcademyAwards,
}

impl EntertainmentYear {
    pub fn empty(year: i32) -> Self {
        Self {
            year,
            movies: Vec::new(),
            series: Vec::new(),
            academy_awards: AcademyAwards::default(),
        }
    }
}

pub struct EntertainmentService {
    catalog: Arc<dyn Catalog>,
    awards: Arc<dyn AwardsSource>,
}

impl EntertainmentService {
    pub fn new(catalog: Arc<dyn Catalog>, awards: Arc<dyn AwardsSource>) -> Self {
        Self { catalog, awards }
    }

    /// Movies, series and awards fetched concurrently; each part degrades on its own.
    pub async fn entertainment_for_year(&self, year: i32) -> EntertainmentYear {
        let (movies, series, academy_awards) = tokio::join!(
            self.top_movies(year),
            self.top_series(year),
            self.academy_awards(year)
        );
        EntertainmentYear {
            year,
            movies,
            series,
            academy_awards,
        }
    }

    async fn top_movies(&self, year: i32) -> Vec<Title> {
        match self.catalog.discover_movies(year).await {
            Ok(movies) => rank_top(movies, year, TOP_TITLES),
            Err(e) => {
                warn!(year, error = ?e, "failed to discover movies");
                Vec::new()
            }
        }
    }

    async fn top_series(&self, year: i32) -> Vec<Title> {
        match self.catalog.discover_series(year).await {
            Ok(series) => rank_top(series, year, TOP_TITLES),
            Err(e) => {
                warn!(year, error = ?e, "failed to discover series");
                Vec::new()
            }
        }
    }

    async fn academy_awards(&self, year: i32) -> AcademyAwards {
        let edition = match self.awards.edition(year).await {
            Ok(Some(edition)) => edition,
            Ok(None) => {
                debug!(year, "no Academy Awards edition for year");
                return AcademyAwards::default();
            }
            Err(e) => {
                warn!(year, error = ?e, "failed to fetch Academy Awards edition");
                return AcademyAwards::default();
            }
        };

        let categories = match self.awards.categories(edition.id).await {
            Ok(categories) => categories,
            Err(e) => {
                warn!(year, edition = edition.id, error = ?e, "failed to fetch award categories");
                return AcademyAwards {
                    edition: Some(edition),
                    ..AcademyAwards::default()
                };
            }
        };

        let find = |award: Award| categories.iter().find(|c| award.matches(&c.name));
        let (best_picture, best_actor, best_actress) = tokio::join!(
            self.picture_winner(edition.id, find(Award::BestPicture)),
            self.acting_winner(edition.id, find(Award::LeadActor)),
            self.acting_winner(edition.id, find(Award::LeadActress)),
        );

        AcademyAwards {
            edition: Some(edition),
            best_picture,
            best_actor,
            best_actress,
        }
    }

    async fn winner(&self, edition_id: u32, category: Option<&Category>) -> Option<Nominee> {
        let category = category?;
        match self.awards.nominees(edition_id, category.id).await {
            Ok(nominees) => nominees.into_iter().find(|n| n.winner),
            Err(e) => {
                warn!(category = %category.name, error = ?e, "failed to fetch nominees");
                None
            }
        }
    }

    async fn picture_winner(&self, edition_id: u32, category: Option<&Category>) -> Option<PictureWinner> {
        let winner = self.winner(edition_id, category).await?;
        let poster_url = match self.catalog.search_movie(&winner.name).await {
            Ok(found) => found.and_then(|movie| movie.poster_url),
            Err(e) => {
                warn!(title = %winner.name, error = ?e, "poster lookup failed");
                None
            }
        };
        Some(PictureWinner {
            title: winner.name,
            producers: winner.more,
            poster_url,
        })
    }

    async fn acting_winner(&self, edition_id: u32, category: Option<&Category>) -> Option<ActingWinner> {
        let winner = self.winner(edition_id, category).await?;
        let image_url = match self.catalog.search_person(&winner.name).await {
            Ok(found) => found.and_then(|person| person.profile_url),
            Err(e) => {
                warn!(name = %winner.name, error = ?e, "profile lookup failed");
                None
            }
        };
        Some(ActingWinner {
            name: winner.name,
            movie: winner.more,
            image_url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entertainment::tmdb::Person;
    use anyhow::Result;
    use async_trait::async_trait;

    fn title(id: u64, name: &str, popularity: f64, rating: f64, date: &str) -> Title {
        Title {
            id,
            title: name.to_string(),
            overview: None,
            poster_url: Some(format!("https://img/{id}.jpg")),
            release_date: Some(date.to_string()),
            popularity: Some(popularity),
            vote_average: Some(rating),
            vote_count: Some(5000),
        }
    }

    struct FakeCatalog {
        fail_series: bool,
    }

    #[async_trait]
    impl Catalog for FakeCatalog {
        async fn discover_movies(&self, _year: i32) -> Result<Vec<Title>> {
            Ok((0..12)
                .map(|i| title(i, &format!("movie {i}"), i as f64 * 10.0, 7.5, "2019-05-01"))
                .collect())
        }

        async fn discover_series(&self, _year: i32) -> Result<Vec<Title>> {
            if self.fail_series {
                anyhow::bail!("tmdb unavailable");
            }
            Ok(vec![
                title(100, "Long Runner", 300.0, 8.0, "1989-12-17"),
                title(101, "Fresh Hit", 200.0, 8.5, "2019-03-01"),
            ])
        }

        async fn search_movie(&self, name: &str) -> Result<Option<Title>> {
            Ok(Some(title(900, name, 1.0, 1.0, "2019-01-01")))
        }

        async fn search_person(&self, name: &str) -> Result<Option<Person>> {
            if name == "Unknown Person" {
                anyhow::bail!("search failed");
            }
            Ok(Some(Person {
                id: 1,
                name: name.to_string(),
                known_for_department: Some("Acting".to_string()),
                profile_url: Some(format!("https://img/{name}.jpg")),
            }))
        }
    }

    struct FakeAwards;

    #[async_trait]
    impl AwardsSource for FakeAwards {
        async fn edition(&self, year: i32) -> Result<Option<Edition>> {
            Ok((year == 2020).then(|| Edition {
                id: 92,
                name: Some("92nd Academy Awards".to_string()),
                edition: Some(92),
                year: Some(2020),
            }))
        }

        async fn categories(&self, _edition_id: u32) -> Result<Vec<Category>> {
            Ok(vec![
                Category {
                    id: 1,
                    name: "Best Picture".to_string(),
                },
                Category {
                    id: 2,
                    name: "Actor In A Leading Role".to_string(),
                },
                Category {
                    id: 3,
                    name: "Actress In A Leading Role".to_string(),
                },
            ])
        }

        async fn nominees(&self, _edition_id: u32, category_id: u32) -> Result<Vec<Nominee>> {
            let nominee = |name: &str, more: &str, winner: bool| Nominee {
                id: None,
                name: name.to_string(),
                more: Some(more.to_string()),
                note: None,
                winner,
            };
            match category_id {
                1 => Ok(vec![nominee("1917", "Sam Mendes", false), nominee("Parasite", "Bong Joon Ho", true)]),
                2 => Ok(vec![nominee("Joaquin Phoenix", "Joker", true)]),
                _ => anyhow::bail!("nominees unavailable"),
            }
        }
    }

    fn service(fail_series: bool) -> EntertainmentService {
        EntertainmentService::new(Arc::new(FakeCatalog { fail_series }), Arc::new(FakeAwards))
    }

    #[tokio::test]
    async fn test_lists_are_ranked_and_capped() {
        let result = service(false).entertainment_for_year(2020).await;

        assert_eq!(result.movies.len(), TOP_TITLES);
        assert_eq!(result.movies[0].title, "movie 11");
        let series: Vec<_> = result.series.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(series, vec!["Fresh Hit", "Long Runner"], "old shows are damped");
    }

    #[tokio::test]
    async fn test_awards_winners_with_images() {
        let awards = service(false).entertainment_for_year(2020).await.academy_awards;

        let picture = awards.best_picture.unwrap();
        assert_eq!(picture.title, "Parasite");
        assert_eq!(picture.poster_url.as_deref(), Some("https://img/900.jpg"));

        let actor = awards.best_actor.unwrap();
        assert_eq!(actor.movie.as_deref(), Some("Joker"));
        assert_eq!(actor.image_url.as_deref(), Some("https://img/Joaquin Phoenix.jpg"));

        assert_eq!(awards.best_actress, None, "failed category degrades alone");
    }

    #[tokio::test]
    async fn test_parts_degrade_independently() {
        let result = service(true).entertainment_for_year(1850).await;

        assert!(result.series.is_empty());
        assert_eq!(result.movies.len(), TOP_TITLES);
        assert_eq!(result.academy_awards, AcademyAwards::default());
    }
}
