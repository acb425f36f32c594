use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use std::ops::Range;

use crate::{
    error::RefreshError,
    store::{Document, FieldValue},
};

/// Forecast offsets written per location: day 1 through day 7.
pub const MAX_FORECAST_OFFSET: usize = 7;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl Location {
    pub fn new(name: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            name: name.into(),
            latitude,
            longitude,
        }
    }
}

/// The `current` block of a forecast response. Missing keys stay `None`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct CurrentConditions {
    #[serde(rename = "temperature_2m")]
    pub temperature: Option<f64>,
    #[serde(rename = "wind_speed_10m")]
    pub wind_speed: Option<f64>,
    #[serde(rename = "wind_gusts_10m")]
    pub wind_gusts: Option<f64>,
    #[serde(rename = "pressure_msl")]
    pub pressure: Option<f64>,
    pub weather_code: Option<Number>,
}

impl CurrentConditions {
    /// Stored fields of the per-location document, stamped with the
    /// server's write time.
    pub fn to_document(&self) -> Document {
        Document::new()
            .with("temperature", self.temperature)
            .with("vent", self.wind_speed)
            .with("rafales", self.wind_gusts)
            .with("pression", self.pressure)
            .with("meteo", self.weather_code.clone())
            .with("derniere_maj", FieldValue::ServerTimestamp)
    }
}

/// The `daily` block: parallel arrays indexed by day offset, 0 being today.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct DailySeries {
    pub time: Vec<String>,
    pub weather_code: Vec<Option<Number>>,
    pub temperature_2m_max: Vec<Option<f64>>,
    pub temperature_2m_min: Vec<Option<f64>>,
    pub wind_speed_10m_max: Vec<Option<f64>>,
    pub wind_gusts_10m_max: Vec<Option<f64>>,
    pub precipitation_probability_max: Vec<Option<Number>>,
}

impl DailySeries {
    /// Decode the raw `daily` block of a response.
    pub fn from_value(daily: Value) -> Result<Self, RefreshError> {
        serde_json::from_value(daily).map_err(RefreshError::InvalidDaily)
    }

    /// Offsets to store, clamped to what the API actually returned.
    /// Today (offset 0) is never included.
    pub fn forecast_offsets(&self) -> Range<usize> {
        1..(MAX_FORECAST_OFFSET + 1).min(self.time.len())
    }

    /// Forecast for one offset. Every series is indexed positionally; one
    /// shorter than `time` fails with [`RefreshError::RaggedSeries`].
    pub fn day(&self, offset: usize) -> Result<DailyForecast, RefreshError> {
        Ok(DailyForecast {
            offset,
            date: at(&self.time, "time", offset)?,
            temp_max: at(&self.temperature_2m_max, "temperature_2m_max", offset)?,
            temp_min: at(&self.temperature_2m_min, "temperature_2m_min", offset)?,
            wind_speed_max: at(&self.wind_speed_10m_max, "wind_speed_10m_max", offset)?,
            wind_gusts_max: at(&self.wind_gusts_10m_max, "wind_gusts_10m_max", offset)?,
            precipitation_probability_max: at(
                &self.precipitation_probability_max,
                "precipitation_probability_max",
                offset,
            )?,
            weather_code: at(&self.weather_code, "weather_code", offset)?,
        })
    }
}

fn at<T: Clone>(series: &[T], field: &'static str, offset: usize) -> Result<T, RefreshError> {
    series
        .get(offset)
        .cloned()
        .ok_or(RefreshError::RaggedSeries {
            field,
            offset,
            len: series.len(),
        })
}

#[derive(Debug, Clone, PartialEq)]
pub struct DailyForecast {
    pub offset: usize,
    pub date: String,
    pub temp_max: Option<f64>,
    pub temp_min: Option<f64>,
    pub wind_speed_max: Option<f64>,
    pub wind_gusts_max: Option<f64>,
    pub precipitation_probability_max: Option<Number>,
    pub weather_code: Option<Number>,
}

impl DailyForecast {
    pub fn document_id(&self) -> String {
        format!("jour_{}", self.offset)
    }

    pub fn to_document(&self) -> Document {
        Document::new()
            .with("date", self.date.as_str())
            .with("temp_max", self.temp_max)
            .with("temp_min", self.temp_min)
            .with("vent_max", self.wind_speed_max)
            .with("rafales_max", self.wind_gusts_max)
            .with("prob_pluie", self.precipitation_probability_max.clone())
            .with("code_meteo", self.weather_code.clone())
    }
}

/// A decoded forecast response. `current` is mandatory. `daily` is kept
/// as raw JSON and only decoded once the current conditions are stored.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ForecastPayload {
    pub current: CurrentConditions,
    #[serde(default)]
    pub daily: Option<Value>,
}
