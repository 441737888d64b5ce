use crate::{
    Config, FetchError, Query, WeatherReport,
    model::{CurrentConditions, ForecastSeries},
    provider::openweather::OpenWeatherProvider,
};
use async_trait::async_trait;
use std::{fmt::Debug, sync::Arc};

pub mod openweather;

#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    async fn current(&self, query: &Query) -> Result<CurrentConditions, FetchError>;

    async fn forecast(&self, query: &Query) -> Result<ForecastSeries, FetchError>;
}

/// Classify `input` and read current conditions and forecast concurrently.
///
/// Both reads must succeed; the first failure is returned and the other
/// result, if any, is dropped.
pub async fn fetch(
    provider: &dyn WeatherProvider,
    input: &str,
) -> Result<WeatherReport, FetchError> {
    let query = Query::parse(input)?;
    fetch_query(provider, &query).await
}

pub async fn fetch_query(
    provider: &dyn WeatherProvider,
    query: &Query,
) -> Result<WeatherReport, FetchError> {
    tracing::debug!(%query, coordinates = query.is_coordinates(), "fetching weather");

    let (current, forecast) = tokio::try_join!(provider.current(query), provider.forecast(query))?;

    Ok(WeatherReport { current, forecast })
}

/// Construct the OpenWeather provider from config.
pub fn provider_from_config(config: &Config) -> anyhow::Result<Arc<dyn WeatherProvider>> {
    let api_key = config.api_key().ok_or_else(|| {
        anyhow::anyhow!(
            "No OpenWeather API key configured.\n\
                 Hint: run `wxlookup configure` or set OPENWEATHER_API_KEY."
        )
    })?;

    let provider = OpenWeatherProvider::new(api_key.to_owned())
        .with_base_url(config.base_url.clone())
        .with_units(config.units);

    Ok(Arc::new(provider))
}
