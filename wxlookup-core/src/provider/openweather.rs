use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, de::DeserializeOwned};

use crate::{
    error::{Endpoint, FetchError},
    model::{Condition, CurrentConditions, ForecastEntry, ForecastSeries, Units, Wind},
    query::Query,
};

use super::WeatherProvider;

pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org/data/2.5";

#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    api_key: String,
    base_url: String,
    units: Units,
    http: Client,
}

impl OpenWeatherProvider {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            units: Units::default(),
            http: Client::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_units(mut self, units: Units) -> Self {
        self.units = units;
        self
    }

    async fn get<T: DeserializeOwned>(
        &self,
        endpoint: Endpoint,
        query: &Query,
    ) -> Result<T, FetchError> {
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), endpoint.path());

        let mut params = query.params();
        tracing::debug!(%endpoint, ?params, units = %self.units, "OpenWeather request");
        params.push(("appid", self.api_key.clone()));
        params.push(("units", self.units.as_str().to_string()));

        let res = self
            .http
            .get(&url)
            .query(&params)
            .send()
            .await
            .map_err(|source| {
                tracing::warn!(%endpoint, error = %source, "OpenWeather request did not complete");
                FetchError::Network { source }
            })?;

        let status = res.status();
        let body = res
            .text()
            .await
            .map_err(|source| FetchError::Network { source })?;

        if !status.is_success() {
            let message = serde_json::from_str::<OwError>(&body)
                .ok()
                .and_then(|e| e.message)
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| endpoint.fallback_message().to_string());

            tracing::warn!(%endpoint, %status, %message, "OpenWeather rejected request");
            return Err(FetchError::Api { message });
        }

        serde_json::from_str(&body).map_err(|source| {
            tracing::warn!(
                %endpoint,
                error = %source,
                body = %truncate_body(&body),
                "OpenWeather body did not decode"
            );
            FetchError::Decode { endpoint, source }
        })
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    async fn current(&self, query: &Query) -> Result<CurrentConditions, FetchError> {
        let parsed: OwCurrentResponse = self.get(Endpoint::Current, query).await?;
        Ok(parsed.into_conditions(self.units))
    }

    async fn forecast(&self, query: &Query) -> Result<ForecastSeries, FetchError> {
        let parsed: OwForecastResponse = self.get(Endpoint::Forecast, query).await?;
        tracing::debug!(entries = parsed.list.len(), city = %parsed.city.name, "forecast received");
        Ok(parsed.into_series(self.units))
    }
}

#[derive(Debug, Deserialize)]
struct OwError {
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
    feels_like: f64,
    #[serde(default)]
    temp_min: Option<f64>,
    #[serde(default)]
    temp_max: Option<f64>,
    humidity: u8,
    pressure: f64,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    #[serde(default)]
    main: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    icon: String,
}

#[derive(Debug, Deserialize)]
struct OwWind {
    speed: f64,
    #[serde(default)]
    deg: f64,
}

impl From<OwWind> for Wind {
    fn from(w: OwWind) -> Self {
        Wind {
            speed: w.speed,
            direction_deg: w.deg,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct OwSys {
    #[serde(default)]
    country: Option<String>,
    #[serde(default, with = "chrono::serde::ts_seconds_option")]
    sunrise: Option<DateTime<Utc>>,
    #[serde(default, with = "chrono::serde::ts_seconds_option")]
    sunset: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    #[serde(default)]
    name: String,
    #[serde(with = "chrono::serde::ts_seconds")]
    dt: DateTime<Utc>,
    main: OwMain,
    #[serde(default)]
    weather: Vec<OwWeather>,
    wind: OwWind,
    #[serde(default)]
    sys: OwSys,
}

impl OwCurrentResponse {
    fn into_conditions(self, units: Units) -> CurrentConditions {
        CurrentConditions {
            location_name: self.name,
            country: self.sys.country.unwrap_or_default(),
            units,
            temperature: self.main.temp,
            feels_like: self.main.feels_like,
            temp_min: self.main.temp_min.unwrap_or(self.main.temp),
            temp_max: self.main.temp_max.unwrap_or(self.main.temp),
            humidity_pct: self.main.humidity,
            pressure_hpa: self.main.pressure,
            wind: self.wind.into(),
            condition: first_condition(self.weather),
            observed_at: self.dt,
            sunrise: self.sys.sunrise,
            sunset: self.sys.sunset,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct OwCity {
    #[serde(default)]
    name: String,
    #[serde(default)]
    country: String,
}

#[derive(Debug, Deserialize)]
struct OwForecastEntry {
    #[serde(with = "chrono::serde::ts_seconds")]
    dt: DateTime<Utc>,
    main: OwMain,
    #[serde(default)]
    weather: Vec<OwWeather>,
    wind: OwWind,
}

#[derive(Debug, Deserialize)]
struct OwForecastResponse {
    #[serde(default)]
    city: OwCity,
    list: Vec<OwForecastEntry>,
}

impl OwForecastResponse {
    fn into_series(self, units: Units) -> ForecastSeries {
        let entries = self
            .list
            .into_iter()
            .map(|e| ForecastEntry {
                timestamp: e.dt,
                temperature: e.main.temp,
                feels_like: e.main.feels_like,
                humidity_pct: e.main.humidity,
                pressure_hpa: e.main.pressure,
                wind: e.wind.into(),
                condition: first_condition(e.weather),
            })
            .collect();

        ForecastSeries {
            city_name: self.city.name,
            country: self.city.country,
            units,
            entries,
        }
    }
}

fn first_condition(weather: Vec<OwWeather>) -> Condition {
    weather
        .into_iter()
        .next()
        .map(|w| Condition {
            summary: w.main,
            description: w.description,
            icon: w.icon,
        })
        .unwrap_or_else(Condition::unknown)
}

fn truncate_body(body: &str) -> &str {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}
