//! Weather payload normalization.
//!
//! The backend forwards a provider-shaped payload with optional sections.
//! [`WeatherSnapshot::from_payload`] maps it into one internal shape: renamed
//! fields, absent numbers read as zero, and a synthesized one-day forecast
//! when the payload carries no daily series.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::serde_helpers::{lenient_number, vec_or_default};
use crate::error::{WardrobeError, WardrobeResult};

// ============================================================================
// Provider payload (GET /weather)
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WeatherPayload {
    pub error: Option<String>,
    pub location: Option<String>,
    pub summary_text: Option<String>,
    pub current: Option<CurrentPayload>,
    pub today_stat: Option<TodayPayload>,
    #[serde(default, deserialize_with = "vec_or_default")]
    pub hourly_trend: Vec<HourlyPayload>,
    pub daily_forecast: Option<Vec<DailyPayload>>,
    pub signals: Option<WeatherSignals>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CurrentPayload {
    #[serde(default, deserialize_with = "lenient_number")]
    pub temp_real: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub temp_feel: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub humidity: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub aqi: Option<f64>,
    pub skycon: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TodayPayload {
    #[serde(default, deserialize_with = "lenient_number")]
    pub temp_min: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub temp_max: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HourlyPayload {
    pub time: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub temp: Option<f64>,
    pub cond: Option<String>,
    pub condition: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DailyPayload {
    pub date: Option<String>,
    pub condition: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub min_temp: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub max_temp: Option<f64>,
}

/// Derived clothing hints computed by the backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeatherSignals {
    #[serde(default)]
    pub need_umbrella: bool,
    #[serde(default)]
    pub need_windbreaker: bool,
    #[serde(default)]
    pub need_sun_protection: bool,
    #[serde(default)]
    pub high_humidity: bool,
    #[serde(default)]
    pub temp_diff_alert: bool,
}

// ============================================================================
// Normalized snapshot
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyForecast {
    pub time: String,
    pub temp: f64,
    pub condition: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyForecast {
    pub date: NaiveDate,
    pub condition: String,
    pub min_temp: f64,
    pub max_temp: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub temp_now: f64,
    pub temp_feel: f64,
    /// Relative humidity in 0..=1
    pub humidity: f64,
    pub aqi: f64,
    pub condition: String,
    pub description: String,
    pub location: Option<String>,
    pub hourly_forecast: Vec<HourlyForecast>,
    /// Never empty.
    pub daily_forecast: Vec<DailyForecast>,
    #[serde(default)]
    pub signals: WeatherSignals,
}

impl WeatherSnapshot {
    /// Normalize a provider payload. `now` dates the synthesized forecast entry.
    pub fn from_payload(payload: WeatherPayload, now: DateTime<Utc>) -> WardrobeResult<Self> {
        if let Some(error) = payload.error {
            return Err(WardrobeError::WeatherFetchFailed(error));
        }

        let current = payload.current.unwrap_or_default();
        let today = payload.today_stat.unwrap_or_default();
        let condition = current.skycon.unwrap_or_default();

        let hourly_forecast = payload
            .hourly_trend
            .into_iter()
            .enumerate()
            .map(|(i, hour)| HourlyForecast {
                time: hour.time.unwrap_or_else(|| format!("{i}:00")),
                temp: hour.temp.unwrap_or(0.0),
                condition: hour.cond.or(hour.condition).unwrap_or_default(),
            })
            .collect();

        let mut daily_forecast: Vec<DailyForecast> = payload
            .daily_forecast
            .unwrap_or_default()
            .into_iter()
            .filter_map(|day| {
                let raw_date = day.date.unwrap_or_default();
                let Some(date) = parse_day(&raw_date) else {
                    warn!(date = %raw_date, "Skipping forecast day with unreadable date");
                    return None;
                };
                Some(DailyForecast {
                    date,
                    condition: day.condition.unwrap_or_default(),
                    min_temp: day.min_temp.unwrap_or(0.0),
                    max_temp: day.max_temp.unwrap_or(0.0),
                })
            })
            .collect();

        if daily_forecast.is_empty() {
            daily_forecast.push(DailyForecast {
                date: now.date_naive(),
                condition: condition.clone(),
                min_temp: today.temp_min.unwrap_or(0.0),
                max_temp: today.temp_max.unwrap_or(0.0),
            });
        }

        Ok(Self {
            temp_now: current.temp_real.unwrap_or(0.0),
            temp_feel: current.temp_feel.unwrap_or(0.0),
            humidity: current.humidity.unwrap_or(0.0),
            aqi: current.aqi.unwrap_or(0.0),
            condition,
            description: payload.summary_text.unwrap_or_default(),
            location: payload.location,
            hourly_forecast,
            daily_forecast,
            signals: payload.signals.unwrap_or_default(),
        })
    }

    /// AQI for display; zero means the provider had no reading.
    pub fn aqi_label(&self) -> String {
        if self.aqi > 0.0 {
            format!("{}", self.aqi.round())
        } else {
            "unknown".to_string()
        }
    }
}

/// Provider dates come as `2024-01-05` or `2024-01-05T00:00+08:00`.
fn parse_day(raw: &str) -> Option<NaiveDate> {
    let day = raw.get(..10)?;
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}
