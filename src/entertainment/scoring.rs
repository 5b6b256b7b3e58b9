//! Ranking of movies and series for a year.
//!
//! `score = (popularity * POPULARITY_WEIGHT + rating/10 * 100 * RATING_WEIGHT) * age_penalty`
//!
//! TMDB's discover results for a year include long-running shows that merely
//! aired an episode that year, so older titles are damped by [`age_penalty`].

/// Weight of TMDB's raw popularity figure.
const POPULARITY_WEIGHT: f64 = 0.6;
/// Weight of the vote average, after scaling 0..10 to 0..100.
const RATING_WEIGHT: f64 = 0.4;

/// Number of titles kept per list.
pub const TOP_TITLES: usize = 8;

/// Inputs the scorer needs from a catalog entry. Missing figures count as zero.
pub trait Scorable {
    fn popularity(&self) -> Option<f64>;
    fn rating(&self) -> Option<f64>;
    /// `YYYY-MM-DD` first air / release date.
    fn first_date(&self) -> Option<&str>;
}

/// Multiplier in `0.5..=1.0` by how many years before `year` the title started.
///
/// Unknown or unparseable dates are not penalised.
pub fn age_penalty(first_date: Option<&str>, year: i32) -> f64 {
    let Some(start) = first_date
        .and_then(|d| d.get(..4))
        .and_then(|y| y.parse::<i32>().ok())
    else {
        return 1.0;
    };

    match year.saturating_sub(start) {
        i32::MIN..=2 => 1.0,
        3..=5 => 0.9,
        6..=10 => 0.8,
        11..=20 => 0.65,
        _ => 0.5,
    }
}

pub fn score(popularity: Option<f64>, rating: Option<f64>, first_date: Option<&str>, year: i32) -> f64 {
    let popularity = popularity.unwrap_or(0.0);
    let rating = rating.unwrap_or(0.0) / 10.0;
    let base = popularity * POPULARITY_WEIGHT + rating * 100.0 * RATING_WEIGHT;
    base * age_penalty(first_date, year)
}

/// Highest-scoring `n` items; equal scores keep their input order.
pub fn rank_top<T: Scorable>(items: Vec<T>, year: i32, n: usize) -> Vec<T> {
    let mut scored: Vec<(f64, T)> = items
        .into_iter()
        .map(|item| {
            let s = score(item.popularity(), item.rating(), item.first_date(), year);
            (s, item)
        })
        .collect();
    // `sort_by` is stable; `total_cmp` keeps NaN from scrambling the order.
    scored.sort_by(|(a, _), (b, _)| b.total_cmp(a));
    scored.into_iter().take(n).map(|(_, item)| item).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Entry {
        name: &'static str,
        popularity: Option<f64>,
        rating: Option<f64>,
        date: Option<&'static str>,
    }

    impl Scorable for Entry {
        fn popularity(&self) -> Option<f64> {
            self.popularity
        }
        fn rating(&self) -> Option<f64> {
            self.rating
        }
        fn first_date(&self) -> Option<&str> {
            self.date
        }
    }

    fn entry(name: &'static str, popularity: f64, rating: f64, date: &'static str) -> Entry {
        Entry {
            name,
            popularity: Some(popularity),
            rating: Some(rating),
            date: Some(date),
        }
    }

    #[test]
    fn test_age_penalty_bands() {
        assert_eq!(age_penalty(Some("2000-09-01"), 2021), 0.5);
        assert_eq!(age_penalty(Some("2019-01-10"), 2021), 1.0);
        assert_eq!(age_penalty(Some("2016"), 2021), 0.9);
        assert_eq!(age_penalty(Some("2011-05-05"), 2021), 0.8);
        assert_eq!(age_penalty(Some("2001-05-05"), 2021), 0.65);
        assert_eq!(age_penalty(Some("2023-01-01"), 2021), 1.0, "future dates are not penalised");
    }

    #[test]
    fn test_age_penalty_extreme_years() {
        assert_eq!(age_penalty(Some("2019-01-01"), i32::MIN), 1.0);
        assert_eq!(age_penalty(Some("1000-01-01"), i32::MAX), 0.5);
        let s = score(Some(10.0), Some(5.0), Some("2019-01-01"), i32::MIN + 5);
        assert!((s - 26.0).abs() < 1e-9, "score was {s}");
    }

    #[test]
    fn test_age_penalty_unknown_dates() {
        assert_eq!(age_penalty(None, 2021), 1.0);
        assert_eq!(age_penalty(Some(""), 2021), 1.0);
        assert_eq!(age_penalty(Some("19"), 2021), 1.0);
        assert_eq!(age_penalty(Some("abcd-01-01"), 2021), 1.0);
    }

    #[test]
    fn test_score_formula() {
        // (100 * 0.6 + 0.8 * 100 * 0.4) * 1.0 = 92
        let s = score(Some(100.0), Some(8.0), Some("2020-01-01"), 2021);
        assert!((s - 92.0).abs() < 1e-9, "score was {s}");

        let missing = score(None, None, None, 2021);
        assert_eq!(missing, 0.0);
    }

    #[test]
    fn test_rank_top_orders_and_truncates() {
        let items = vec![
            entry("old-hit", 200.0, 9.0, "1990-01-01"),
            entry("new-hit", 150.0, 8.0, "2020-01-01"),
            entry("niche", 10.0, 9.5, "2021-01-01"),
        ];
        let ranked = rank_top(items, 2021, 2);
        let names: Vec<_> = ranked.iter().map(|e| e.name).collect();
        // old-hit: (120 + 36) * 0.5 = 78; new-hit: (90 + 32) * 1.0 = 122; niche: 6 + 38 = 44
        assert_eq!(names, vec!["new-hit", "old-hit"]);
    }

    #[test]
    fn test_rank_top_is_stable_for_ties() {
        let items = vec![
            entry("first", 50.0, 5.0, "2021-01-01"),
            entry("second", 50.0, 5.0, "2021-06-01"),
            entry("third", 50.0, 5.0, "2020-01-01"),
        ];
        let names: Vec<_> = rank_top(items, 2021, TOP_TITLES)
            .iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, vec!["first", "second", "third"]);
    }
}
