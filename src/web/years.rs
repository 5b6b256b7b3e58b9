//! Year overview handlers: the full composite and each subsystem on its own.

use axum::extract::rejection::PathRejection;
use axum::extract::{Path, State};
use axum::response::Response;
use std::sync::Arc;
use tracing::debug;

use crate::state::AppState;
use crate::web::error::ApiError;
use crate::web::routes::{cache, with_cache_control};
use crate::year::YearOverview;

/// Reject non-integer years with a JSON error instead of axum's plain-text rejection.
fn parse_year(path: Result<Path<i32>, PathRejection>) -> Result<i32, ApiError> {
    match path {
        Ok(Path(year)) => Ok(year),
        Err(rejection) => Err(ApiError::invalid_year(rejection.body_text())),
    }
}

/// `GET /api/v1/years/{year}`
pub(super) async fn get_year(
    State(state): State<AppState>,
    path: Result<Path<i32>, PathRejection>,
) -> Result<Response, ApiError> {
    let year = parse_year(path)?;
    let overview = state.aggregator.get_year(year).await?;
    Ok(with_cache_control(overview.as_ref(), cache::YEAR))
}

/// A fresh composite for `year`, if one is cached; branch routes reuse it instead of refetching.
fn cached(state: &AppState, year: i32) -> Option<Arc<YearOverview>> {
    let hit = state.aggregator.cached(year);
    debug!(year, hit = hit.is_some(), "branch route cache lookup");
    hit
}

/// `GET /api/v1/years/{year}/music`
pub(super) async fn get_music(
    State(state): State<AppState>,
    path: Result<Path<i32>, PathRejection>,
) -> Result<Response, ApiError> {
    let year = parse_year(path)?;
    let response = match cached(&state, year) {
        Some(overview) => with_cache_control(&overview.music, cache::YEAR),
        None => {
            let music = state.aggregator.providers().music.music(year).await;
            with_cache_control(music, cache::YEAR)
        }
    };
    Ok(response)
}

/// `GET /api/v1/years/{year}/entertainment`
pub(super) async fn get_entertainment(
    State(state): State<AppState>,
    path: Result<Path<i32>, PathRejection>,
) -> Result<Response, ApiError> {
    let year = parse_year(path)?;
    let response = match cached(&state, year) {
        Some(overview) => with_cache_control(&overview.entertainment, cache::YEAR),
        None => {
            let entertainment = state
                .aggregator
                .providers()
                .entertainment
                .entertainment(year)
                .await;
            with_cache_control(entertainment, cache::YEAR)
        }
    };
    Ok(response)
}

/// `GET /api/v1/years/{year}/events`
pub(super) async fn get_events(
    State(state): State<AppState>,
    path: Result<Path<i32>, PathRejection>,
) -> Result<Response, ApiError> {
    let year = parse_year(path)?;
    let response = match cached(&state, year) {
        Some(overview) => with_cache_control(&overview.events, cache::YEAR),
        None => {
            let events = state.aggregator.providers().events.events(year).await;
            with_cache_control(events, cache::YEAR)
        }
    };
    Ok(response)
}

/// `GET /api/v1/years/{year}/nobel`
pub(super) async fn get_nobel(
    State(state): State<AppState>,
    path: Result<Path<i32>, PathRejection>,
) -> Result<Response, ApiError> {
    let year = parse_year(path)?;
    let response = match cached(&state, year) {
        Some(overview) => with_cache_control(&overview.nobel, cache::YEAR),
        None => {
            let nobel = state.aggregator.providers().nobel.nobel(year).await;
            with_cache_control(nobel, cache::YEAR)
        }
    };
    Ok(response)
}
