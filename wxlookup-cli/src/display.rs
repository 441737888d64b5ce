use std::fmt::Write as _;

use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::Serialize;
use wxlookup_core::{
    CurrentConditions, DailyBucket, DisplayState, ForecastEntry, ForecastSeries, Units,
    group_by_day_local,
    model::{celsius_to_fahrenheit, format_temperature},
};

#[derive(Debug, Clone, Copy, Default)]
pub struct DisplayOptions {
    pub fahrenheit: bool,
    pub json: bool,
}

pub fn print_state(state: &DisplayState, opts: &DisplayOptions) -> anyhow::Result<()> {
    let (Some(current), Some(forecast)) = (&state.current, &state.forecast) else {
        return Ok(());
    };
    let days = group_by_day_local(&forecast.entries);

    if opts.json {
        let report = JsonReport::new(current, forecast, &days);
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", render_current(current, opts));
        print!("{}", render_days(&days, forecast.units, opts));
    }
    Ok(())
}

#[derive(Serialize)]
struct JsonDay<'a> {
    date: NaiveDate,
    temp_min: f64,
    temp_max: f64,
    representative: &'a ForecastEntry,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    current: &'a CurrentConditions,
    forecast: &'a ForecastSeries,
    daily: Vec<JsonDay<'a>>,
}

impl<'a> JsonReport<'a> {
    fn new(
        current: &'a CurrentConditions,
        forecast: &'a ForecastSeries,
        days: &'a [DailyBucket],
    ) -> Self {
        let daily = days
            .iter()
            .map(|d| {
                let (temp_min, temp_max) = d.temp_range();
                JsonDay {
                    date: d.date,
                    temp_min,
                    temp_max,
                    representative: d.representative(),
                }
            })
            .collect();
        Self {
            current,
            forecast,
            daily,
        }
    }
}

fn temperature(value: f64, units: Units, opts: &DisplayOptions) -> String {
    if opts.fahrenheit && units == Units::Metric {
        format_temperature(celsius_to_fahrenheit(value), "F")
    } else {
        format_temperature(value, units.temperature_symbol())
    }
}

fn local_time(ts: DateTime<Utc>) -> String {
    ts.with_timezone(&Local).format("%H:%M").to_string()
}

pub fn render_current(c: &CurrentConditions, opts: &DisplayOptions) -> String {
    let mut out = String::new();
    let temp = |v| temperature(v, c.units, opts);

    let place = if c.country.is_empty() {
        c.location_name.clone()
    } else {
        format!("{}, {}", c.location_name, c.country)
    };

    let _ = writeln!(out, "{place}  (observed {})", local_time(c.observed_at));
    let _ = writeln!(
        out,
        "  {}  {}  (feels like {})",
        temp(c.temperature),
        c.condition.description,
        temp(c.feels_like)
    );
    let _ = writeln!(out, "  Low/High   {} / {}", temp(c.temp_min), temp(c.temp_max));
    let _ = writeln!(out, "  Humidity   {}%", c.humidity_pct);
    let _ = writeln!(
        out,
        "  Wind       {:.1} {} {}",
        c.wind.speed,
        c.units.speed_label(),
        c.wind.compass()
    );
    let _ = writeln!(out, "  Pressure   {} hPa", c.pressure_hpa);
    if let (Some(rise), Some(set)) = (c.sunrise, c.sunset) {
        let _ = writeln!(out, "  Sunrise    {}   Sunset {}", local_time(rise), local_time(set));
    }
    if let Some(url) = c.condition.icon_url() {
        let _ = writeln!(out, "  Icon       {url}");
    }
    out
}

pub fn render_days(days: &[DailyBucket], units: Units, opts: &DisplayOptions) -> String {
    let mut out = String::new();
    if days.is_empty() {
        return out;
    }

    let _ = writeln!(out, "\n{}-Day Forecast", days.len());
    for day in days {
        let e = day.representative();
        let _ = writeln!(
            out,
            "  {:<12} {:>6}  {:<22} humidity {:>3}%  wind {:.1} {} {}",
            day.date.format("%a, %b %-d").to_string(),
            temperature(e.temperature, units, opts),
            e.condition.description,
            e.humidity_pct,
            e.wind.speed,
            units.speed_label(),
            e.wind.compass(),
        );
    }
    out
}
