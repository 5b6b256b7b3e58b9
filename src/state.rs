//! Application state shared with every request handler.

use std::sync::Arc;

use crate::config::Config;
use crate::year::YearAggregator;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub aggregator: Arc<YearAggregator>,
}

impl AppState {
    pub fn new(config: Arc<Config>, aggregator: Arc<YearAggregator>) -> Self {
        Self { config, aggregator }
    }
}
