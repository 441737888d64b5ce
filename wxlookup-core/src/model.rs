use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

const ICON_BASE_URL: &str = "https://openweathermap.org/img/wn";
const COMPASS_POINTS: [&str; 8] = ["N", "NE", "E", "SE", "S", "SW", "W", "NW"];

/// Measurement system requested from the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    #[default]
    Metric,
    Imperial,
    Standard,
}

impl Units {
    pub fn as_str(&self) -> &'static str {
        match self {
            Units::Metric => "metric",
            Units::Imperial => "imperial",
            Units::Standard => "standard",
        }
    }

    pub fn temperature_symbol(&self) -> &'static str {
        match self {
            Units::Metric => "C",
            Units::Imperial => "F",
            Units::Standard => "K",
        }
    }

    pub fn speed_label(&self) -> &'static str {
        match self {
            Units::Imperial => "mph",
            Units::Metric | Units::Standard => "m/s",
        }
    }

    pub const fn all() -> &'static [Units] {
        &[Units::Metric, Units::Imperial, Units::Standard]
    }
}

impl std::fmt::Display for Units {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for Units {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "metric" => Ok(Units::Metric),
            "imperial" => Ok(Units::Imperial),
            "standard" => Ok(Units::Standard),
            _ => Err(anyhow::anyhow!(
                "Unknown units '{value}'. Supported units: metric, imperial, standard."
            )),
        }
    }
}

/// Textual condition as reported by the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    /// Short group name, e.g. "Clouds".
    pub summary: String,
    pub description: String,
    /// Provider icon code, e.g. "04d".
    pub icon: String,
}

impl Condition {
    pub fn unknown() -> Self {
        Self {
            summary: "Unknown".to_string(),
            description: "Unknown".to_string(),
            icon: String::new(),
        }
    }

    pub fn icon_url(&self) -> Option<String> {
        (!self.icon.is_empty()).then(|| icon_url(&self.icon))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Wind {
    pub speed: f64,
    /// Meteorological direction in degrees, where the wind blows from.
    pub direction_deg: f64,
}

impl Wind {
    pub fn compass(&self) -> &'static str {
        compass_point(self.direction_deg)
    }
}

/// A single snapshot of the weather at one place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentConditions {
    pub location_name: String,
    pub country: String,
    pub units: Units,
    pub temperature: f64,
    pub feels_like: f64,
    pub temp_min: f64,
    pub temp_max: f64,
    pub humidity_pct: u8,
    pub pressure_hpa: f64,
    pub wind: Wind,
    pub condition: Condition,
    pub observed_at: DateTime<Utc>,
    pub sunrise: Option<DateTime<Utc>>,
    pub sunset: Option<DateTime<Utc>>,
}

/// One point of the 3-hourly forecast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastEntry {
    pub timestamp: DateTime<Utc>,
    pub temperature: f64,
    pub feels_like: f64,
    pub humidity_pct: u8,
    pub pressure_hpa: f64,
    pub wind: Wind,
    pub condition: Condition,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastSeries {
    pub city_name: String,
    pub country: String,
    pub units: Units,
    pub entries: Vec<ForecastEntry>,
}

/// Forecast entries sharing one calendar date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyBucket {
    pub date: NaiveDate,
    pub entries: Vec<ForecastEntry>,
    representative: usize,
}

impl DailyBucket {
    pub(crate) fn new(date: NaiveDate, entries: Vec<ForecastEntry>, representative: usize) -> Self {
        debug_assert!(representative < entries.len());
        Self {
            date,
            entries,
            representative,
        }
    }

    /// The entry chosen to summarize the day.
    pub fn representative(&self) -> &ForecastEntry {
        &self.entries[self.representative]
    }

    pub fn temp_range(&self) -> (f64, f64) {
        self.entries.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), e| {
            (lo.min(e.temperature), hi.max(e.temperature))
        })
    }
}

/// Result of a combined fetch: both halves or nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReport {
    pub current: CurrentConditions,
    pub forecast: ForecastSeries,
}

pub fn icon_url(icon: &str) -> String {
    format!("{ICON_BASE_URL}/{icon}@2x.png")
}

pub fn compass_point(degrees: f64) -> &'static str {
    let index = (degrees.rem_euclid(360.0) / 45.0).round() as usize % COMPASS_POINTS.len();
    COMPASS_POINTS[index]
}

pub fn celsius_to_fahrenheit(celsius: f64) -> f64 {
    celsius * 9.0 / 5.0 + 32.0
}

pub fn format_temperature(value: f64, symbol: &str) -> String {
    format!("{}°{symbol}", value.round() as i64)
}
