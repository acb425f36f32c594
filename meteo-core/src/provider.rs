use async_trait::async_trait;
use std::fmt::Debug;

use crate::{
    config::ForecastConfig,
    error::ProviderError,
    model::{ForecastPayload, Location},
    provider::openmeteo::OpenMeteoProvider,
};

pub mod openmeteo;

#[async_trait]
pub trait ForecastProvider: Send + Sync + Debug {
    /// Current conditions and daily forecast for one location.
    async fn fetch(&self, location: &Location) -> Result<ForecastPayload, ProviderError>;
}

/// Construct the forecast provider from config.
pub fn provider_from_config(config: &ForecastConfig) -> anyhow::Result<Box<dyn ForecastProvider>> {
    let provider = OpenMeteoProvider::from_config(config)?;
    Ok(Box::new(provider))
}
