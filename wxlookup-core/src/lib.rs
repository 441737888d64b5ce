//! Core library for the `wxlookup` CLI.
//!
//! This crate defines:
//! - Query classification (place name vs. coordinates)
//! - The OpenWeather fetch layer with typed errors
//! - Grouping of the 3-hourly forecast into days
//! - Position acquisition and the search session that ties it together
//! - Configuration handling
//!
//! It is used by `wxlookup-cli`, but can also be reused by other front ends.

pub mod config;
pub mod error;
pub mod forecast;
pub mod geolocation;
pub mod model;
pub mod provider;
pub mod query;
pub mod session;

pub use config::{Config, GeolocationConfig};
pub use error::{Endpoint, FetchError, FetchErrorKind, GeolocationError, GeolocationErrorKind};
pub use forecast::{group_by_day, group_by_day_local};
pub use geolocation::{Geolocator, GeolocationOptions, Position, PositionReply, PositionSource};
pub use model::{
    CurrentConditions, DailyBucket, ForecastEntry, ForecastSeries, Units, WeatherReport,
};
pub use provider::{WeatherProvider, fetch, provider_from_config};
pub use query::Query;
pub use session::{DisplayState, SearchOrigin, SearchOutcome, SearchSession};
