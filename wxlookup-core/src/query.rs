use std::{fmt, sync::LazyLock};

use regex::Regex;

use crate::error::FetchError;

/// `latitude,longitude` with optional sign and fraction on each part.
static COORDINATE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^-?[0-9]+(\.[0-9]+)?,-?[0-9]+(\.[0-9]+)?$").expect("coordinate pattern is valid")
});

/// A search input, classified as either a place name or a coordinate pair.
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    PlaceName(String),
    Coordinates { lat: f64, lon: f64 },
}

impl Query {
    /// Classify a raw search string.
    ///
    /// Input matching the coordinate pattern is parsed into two numbers;
    /// everything else becomes a place name with surrounding whitespace
    /// removed. Fails only when the pattern matches but a component does
    /// not parse into a finite number.
    pub fn parse(input: &str) -> Result<Self, FetchError> {
        if !is_coordinates(input) {
            return Ok(Query::PlaceName(input.trim().to_string()));
        }

        let invalid = || FetchError::InvalidInput {
            input: input.to_string(),
        };

        let (lat, lon) = input.split_once(',').ok_or_else(invalid)?;
        let lat = parse_component(lat).ok_or_else(invalid)?;
        let lon = parse_component(lon).ok_or_else(invalid)?;

        Ok(Query::Coordinates { lat, lon })
    }

    /// Query-string pairs identifying the location for the provider.
    pub fn params(&self) -> Vec<(&'static str, String)> {
        match self {
            Query::PlaceName(name) => vec![("q", name.clone())],
            Query::Coordinates { lat, lon } => {
                vec![("lat", lat.to_string()), ("lon", lon.to_string())]
            }
        }
    }

    pub fn is_coordinates(&self) -> bool {
        matches!(self, Query::Coordinates { .. })
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Query::PlaceName(name) => f.write_str(name),
            Query::Coordinates { lat, lon } => write!(f, "{lat},{lon}"),
        }
    }
}

pub fn is_coordinates(input: &str) -> bool {
    COORDINATE_PATTERN.is_match(input)
}

fn parse_component(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}
