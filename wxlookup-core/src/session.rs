//! Search orchestration and the state a front end displays.

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use parking_lot::Mutex;

use crate::{
    error::{FetchError, GeolocationError},
    geolocation::Geolocator,
    model::{CurrentConditions, ForecastSeries, WeatherReport},
    provider::{WeatherProvider, fetch},
};

/// What started a search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOrigin {
    /// Typed by the user. Failures are always shown.
    Manual,
    /// Triggered by a location request. Fetch failures are not shown.
    Geolocation,
}

impl SearchOrigin {
    pub fn shows_fetch_errors(&self) -> bool {
        matches!(self, SearchOrigin::Manual)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DisplayState {
    pub current: Option<CurrentConditions>,
    pub forecast: Option<ForecastSeries>,
    pub error: Option<String>,
    pub loading: bool,
}

#[derive(Debug)]
pub enum SearchOutcome {
    /// The report is now on display.
    Applied,
    /// The search failed; the display was cleared.
    Failed(FetchError),
    /// A newer search started first; this result was dropped.
    Superseded,
    /// Nothing was searched, e.g. blank input or a location request
    /// already in flight.
    Ignored,
}

/// Holds display state and runs searches against a provider.
///
/// Every search takes a generation token. Only a search whose token is
/// still the latest when its fetch resolves may touch the state.
#[derive(Debug)]
pub struct SearchSession {
    provider: Arc<dyn WeatherProvider>,
    state: Mutex<DisplayState>,
    generation: AtomicU64,
}

impl SearchSession {
    pub fn new(provider: Arc<dyn WeatherProvider>) -> Self {
        Self {
            provider,
            state: Mutex::new(DisplayState::default()),
            generation: AtomicU64::new(0),
        }
    }

    pub fn state(&self) -> DisplayState {
        self.state.lock().clone()
    }

    pub async fn search(&self, input: &str, origin: SearchOrigin) -> SearchOutcome {
        if origin == SearchOrigin::Manual && input.trim().is_empty() {
            return SearchOutcome::Ignored;
        }

        let token = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        {
            let mut state = self.state.lock();
            state.loading = true;
            state.error = None;
        }
        tracing::debug!(token, ?origin, input, "search started");

        let result = fetch(self.provider.as_ref(), input).await;

        let mut state = self.state.lock();
        if self.generation.load(Ordering::SeqCst) != token {
            tracing::debug!(token, "discarding result of superseded search");
            return SearchOutcome::Superseded;
        }
        state.loading = false;

        match result {
            Ok(WeatherReport { current, forecast }) => {
                tracing::info!(
                    location = %current.location_name,
                    entries = forecast.entries.len(),
                    "weather updated"
                );
                state.current = Some(current);
                state.forecast = Some(forecast);
                SearchOutcome::Applied
            }
            Err(err) => {
                tracing::warn!(error = %err, kind = ?err.kind(), ?origin, "search failed");
                state.current = None;
                state.forecast = None;
                if origin.shows_fetch_errors() {
                    state.error = Some(err.to_string());
                }
                SearchOutcome::Failed(err)
            }
        }
    }

    /// Acquire the current position and search for it.
    ///
    /// Geolocation failures are always put on display and returned;
    /// failures of the follow-up search are not.
    pub async fn locate_and_search(
        &self,
        geolocator: &Geolocator,
    ) -> Result<SearchOutcome, GeolocationError> {
        let position = match geolocator.locate().await {
            Ok(Some(position)) => position,
            Ok(None) => return Ok(SearchOutcome::Ignored),
            Err(err) => {
                self.state.lock().error = Some(err.to_string());
                return Err(err);
            }
        };

        Ok(self
            .search(&position.to_query_string(), SearchOrigin::Geolocation)
            .await)
    }
}
