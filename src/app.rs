use crate::config::Config;
use crate::entertainment::{AwardsClient, EntertainmentService, TmdbClient};
use crate::events::{EventService, MediaWikiClient};
use crate::http::build_client;
use crate::music::{MusicService, SpotifyClient, WikipediaChartClient};
use crate::nobel::{NobelClient, NobelService, WikipediaImageClient};
use crate::state::AppState;
use crate::utils::fmt_duration;
use crate::web::create_router;
use crate::year::{Providers, YearAggregator};
use anyhow::Context;
use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

/// Main application struct containing all necessary components
pub struct App {
    config: Arc<Config>,
    app_state: AppState,
}

impl App {
    /// Build every upstream client and service from `config`.
    pub fn new(config: Config) -> Result<Self, anyhow::Error> {
        let http = build_client(&config.user_agent, config.request_timeout)?;

        if config.spotify_client_id.is_empty() || config.spotify_client_secret.is_empty() {
            warn!("Spotify credentials not configured; music metadata will use placeholders");
        }
        if config.tmdb_api_key.is_empty() {
            warn!("TMDB API key not configured; movie and series lists will be empty");
        }

        let music = MusicService::new(
            Arc::new(WikipediaChartClient::new(http.clone())),
            Arc::new(SpotifyClient::new(
                http.clone(),
                config.spotify_client_id.clone(),
                config.spotify_client_secret.clone(),
            )),
            config.enrichment_concurrency,
            config.cache_ttl,
            config.cache_capacity,
        );
        let entertainment = EntertainmentService::new(
            Arc::new(TmdbClient::new(http.clone(), config.tmdb_api_key.clone())),
            Arc::new(AwardsClient::new(http.clone())),
        );
        let events = EventService::new(
            Arc::new(MediaWikiClient::new(http.clone())),
            config.events_timeout,
        );
        let nobel = NobelService::new(
            Arc::new(NobelClient::new(http.clone())),
            Arc::new(WikipediaImageClient::new(http)),
            config.enrichment_concurrency,
        );

        let providers = Providers {
            music: Arc::new(music),
            entertainment: Arc::new(entertainment),
            events: Arc::new(events),
            nobel: Arc::new(nobel),
        };
        let aggregator = YearAggregator::new(
            providers,
            config.branch_timeout,
            config.cache_ttl,
            config.cache_capacity,
        );

        info!(
            request_timeout = fmt_duration(config.request_timeout),
            branch_timeout = fmt_duration(config.branch_timeout),
            cache_ttl = fmt_duration(config.cache_ttl),
            cache_capacity = config.cache_capacity,
            enrichment_concurrency = config.enrichment_concurrency,
            "services initialized"
        );

        let config = Arc::new(config);
        let app_state = AppState::new(Arc::clone(&config), Arc::new(aggregator));
        Ok(App { config, app_state })
    }

    /// Serve the HTTP API until Ctrl-C, then drain in-flight requests for up to `shutdown_timeout`.
    pub async fn serve(self) -> ExitCode {
        match self.run_server().await {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                error!(error = ?e, "server exited with error");
                ExitCode::FAILURE
            }
        }
    }

    async fn run_server(self) -> anyhow::Result<()> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.config.port));
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind {addr}"))?;
        info!(address = %addr, "web server listening");

        // Whole-request bound, comfortably above a single branch's budget.
        let request_timeout = self.config.branch_timeout * 2;
        let router = create_router(self.app_state.clone(), request_timeout);

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
        let server = tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
        });

        tokio::signal::ctrl_c()
            .await
            .context("Failed to listen for shutdown signal")?;
        info!(
            timeout = fmt_duration(self.config.shutdown_timeout),
            "shutdown requested, draining connections"
        );
        let _ = shutdown_tx.send(());

        match tokio::time::timeout(self.config.shutdown_timeout, server).await {
            Ok(Ok(result)) => result.context("Server error")?,
            Ok(Err(e)) => anyhow::bail!("Server task failed: {e}"),
            Err(_) => warn!("graceful shutdown timed out, exiting anyway"),
        }
        info!("shutdown complete");
        Ok(())
    }

    /// Build one year's overview and print it to stdout as JSON.
    pub async fn print_year(self, year: i32) -> ExitCode {
        let result = self
            .app_state
            .aggregator
            .get_year(year)
            .await
            .context("Failed to build year overview")
            .and_then(|overview| {
                serde_json::to_string_pretty(overview.as_ref()).context("Failed to serialize year overview")
            });

        match result {
            Ok(json) => {
                println!("{json}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                error!(year, error = ?e, "year command failed");
                ExitCode::FAILURE
            }
        }
    }
}
