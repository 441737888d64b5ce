use std::fmt;

use thiserror::Error;

/// Which OpenWeather endpoint a request went to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Current,
    Forecast,
}

impl Endpoint {
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::Current => "weather",
            Endpoint::Forecast => "forecast",
        }
    }

    /// Message used when the provider rejects a request without saying why.
    pub fn fallback_message(&self) -> &'static str {
        match self {
            Endpoint::Current => "Failed to fetch weather data",
            Endpoint::Forecast => "Failed to fetch forecast data",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Failure of a weather lookup.
///
/// Callers branch on the variant; the `Display` text is what gets shown
/// to the user.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The input looked like coordinates but did not yield two finite numbers.
    #[error("Invalid coordinates format: '{input}'")]
    InvalidInput { input: String },

    /// The provider answered with an error body, e.g. an unknown city.
    #[error("{message}")]
    Api { message: String },

    /// The request never reached the provider or no response came back.
    #[error("Network error")]
    Network {
        #[source]
        source: reqwest::Error,
    },

    /// The provider answered successfully but the body was not understood.
    #[error("Unexpected response from the {endpoint} endpoint")]
    Decode {
        endpoint: Endpoint,
        #[source]
        source: serde_json::Error,
    },
}

impl FetchError {
    pub fn api<S: Into<String>>(message: S) -> Self {
        Self::Api {
            message: message.into(),
        }
    }

    pub fn kind(&self) -> FetchErrorKind {
        match self {
            FetchError::InvalidInput { .. } => FetchErrorKind::InvalidInput,
            FetchError::Api { .. } => FetchErrorKind::Api,
            FetchError::Network { .. } => FetchErrorKind::Network,
            FetchError::Decode { .. } => FetchErrorKind::Decode,
        }
    }
}

/// Field-less discriminant of [`FetchError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchErrorKind {
    InvalidInput,
    Api,
    Network,
    Decode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeolocationErrorKind {
    PermissionDenied,
    PositionUnavailable,
    Timeout,
    Unsupported,
    Unknown,
}

impl GeolocationErrorKind {
    pub fn message(&self) -> &'static str {
        match self {
            GeolocationErrorKind::PermissionDenied => {
                "Location access was denied. Please enter a city name instead."
            }
            GeolocationErrorKind::PositionUnavailable => {
                "Your location is currently unavailable. Please enter a city name instead."
            }
            GeolocationErrorKind::Timeout => {
                "Timed out while getting your location. Please enter a city name instead."
            }
            GeolocationErrorKind::Unsupported => {
                "Geolocation is not supported here. Please enter a city name."
            }
            GeolocationErrorKind::Unknown => {
                "Unable to get your location. Please enter a city name instead."
            }
        }
    }
}

impl fmt::Display for GeolocationErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Failure to acquire the current position.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}")]
pub struct GeolocationError {
    pub kind: GeolocationErrorKind,
}

impl GeolocationError {
    pub fn new(kind: GeolocationErrorKind) -> Self {
        Self { kind }
    }
}

impl From<GeolocationErrorKind> for GeolocationError {
    fn from(kind: GeolocationErrorKind) -> Self {
        Self::new(kind)
    }
}
