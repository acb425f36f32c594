use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use super::ForecastProvider;
use crate::{
    config::ForecastConfig,
    error::{ProviderError, truncate_body},
    model::{ForecastPayload, Location},
};

pub const CURRENT_FIELDS: &str =
    "temperature_2m,wind_speed_10m,wind_direction_10m,wind_gusts_10m,pressure_msl,weather_code";

pub const DAILY_FIELDS: &str = "weather_code,temperature_2m_max,temperature_2m_min,\
wind_speed_10m_max,wind_gusts_10m_max,wind_direction_10m_dominant,uv_index_max,\
precipitation_sum,precipitation_probability_max";

#[derive(Debug, Clone)]
pub struct OpenMeteoProvider {
    http: Client,
    base_url: String,
    timezone: String,
    wind_speed_unit: String,
    forecast_days: u8,
}

/// Body of an Open-Meteo error answer.
#[derive(Debug, Deserialize)]
struct OmError {
    reason: String,
}

impl OpenMeteoProvider {
    pub fn new(http: Client, config: &ForecastConfig) -> Self {
        Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timezone: config.timezone.clone(),
            wind_speed_unit: config.wind_speed_unit.clone(),
            forecast_days: config.forecast_days,
        }
    }

    pub fn from_config(config: &ForecastConfig) -> Result<Self, ProviderError> {
        let mut builder = Client::builder();
        if let Some(secs) = config.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        Ok(Self::new(builder.build()?, config))
    }

    fn query(&self, location: &Location) -> Vec<(&'static str, String)> {
        vec![
            ("latitude", location.latitude.to_string()),
            ("longitude", location.longitude.to_string()),
            ("current", CURRENT_FIELDS.to_string()),
            ("daily", DAILY_FIELDS.to_string()),
            ("wind_speed_unit", self.wind_speed_unit.clone()),
            ("timezone", self.timezone.clone()),
            ("forecast_days", self.forecast_days.to_string()),
        ]
    }
}

#[async_trait]
impl ForecastProvider for OpenMeteoProvider {
    async fn fetch(&self, location: &Location) -> Result<ForecastPayload, ProviderError> {
        let url = format!("{}/v1/forecast", self.base_url);

        tracing::debug!(location = %location.name, "requesting forecast");
        let res = self
            .http
            .get(&url)
            .query(&self.query(location))
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;

        if !status.is_success() {
            let reason = serde_json::from_str::<OmError>(&body)
                .map(|e| e.reason)
                .unwrap_or_else(|_| truncate_body(&body));
            return Err(ProviderError::Status { status, reason });
        }

        Ok(serde_json::from_str(&body)?)
    }
}
