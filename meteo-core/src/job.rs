//! The refresh job: for every location, fetch the forecast, merge the
//! current conditions into the location document and overwrite the daily
//! forecast documents beneath it.
//!
//! Locations are processed one after the other. A failure only affects the
//! location it happened on; the batch always runs to the end and returns a
//! [`BatchReport`].

use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};

use crate::{
    error::RefreshError,
    model::{DailyForecast, DailySeries, Location},
    provider::ForecastProvider,
    report::{BatchReport, LocationOutcome, LocationRefresh},
    store::{DocumentPath, DocumentStore},
};

/// Where documents live: `<collection>/<location>` for current conditions,
/// `<collection>/<location>/<forecast_collection>/jour_<n>` for forecasts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionLayout {
    pub collection: String,
    pub forecast_collection: String,
}

impl Default for CollectionLayout {
    fn default() -> Self {
        Self {
            collection: "meteo_caledonie".to_string(),
            forecast_collection: "previsions".to_string(),
        }
    }
}

impl CollectionLayout {
    pub fn current_path(&self, location: &str) -> DocumentPath {
        DocumentPath::new(&self.collection, location)
    }

    pub fn forecast_path(&self, location: &str, day: &DailyForecast) -> DocumentPath {
        self.current_path(location)
            .child(&self.forecast_collection, day.document_id())
    }
}

#[derive(Debug)]
pub struct RefreshJob {
    provider: Box<dyn ForecastProvider>,
    store: Arc<dyn DocumentStore>,
    layout: CollectionLayout,
}

impl RefreshJob {
    pub fn new(
        provider: Box<dyn ForecastProvider>,
        store: Arc<dyn DocumentStore>,
        layout: CollectionLayout,
    ) -> Self {
        Self {
            provider,
            store,
            layout,
        }
    }

    /// Refresh a single location. Writes already made stay in place when a
    /// later step fails.
    #[tracing::instrument(skip_all, fields(location = %location.name))]
    pub async fn refresh_location(
        &self,
        location: &Location,
    ) -> Result<LocationRefresh, RefreshError> {
        let payload = self.provider.fetch(location).await?;

        let current_path = self.layout.current_path(&location.name);
        self.store
            .merge(&current_path, payload.current.to_document())
            .await?;

        let raw_daily = payload.daily.ok_or(RefreshError::MissingDaily)?;
        let daily = DailySeries::from_value(raw_daily)?;
        let mut forecast_days = 0;
        for offset in daily.forecast_offsets() {
            let day = daily.day(offset)?;
            let path = self.layout.forecast_path(&location.name, &day);
            self.store.set(&path, day.to_document()).await?;
            forecast_days += 1;
        }

        Ok(LocationRefresh {
            forecast_days,
            days_available: daily.time.len(),
        })
    }

    /// Refresh every location in order. Never fails; per-location errors
    /// are logged and collected in the report.
    pub async fn run(&self, locations: &[Location]) -> BatchReport {
        info!("🔄 Refreshing weather for {} locations", locations.len());
        let started_at = Utc::now();

        let mut outcomes = Vec::with_capacity(locations.len());
        for location in locations {
            let outcome = LocationOutcome {
                location: location.name.clone(),
                result: self.refresh_location(location).await,
            };

            if outcome.is_success() {
                info!("{outcome}");
            } else {
                warn!("{outcome}");
            }
            outcomes.push(outcome);
        }

        let report = BatchReport {
            started_at,
            finished_at: Utc::now(),
            outcomes,
        };
        info!("✨ {report}");
        report
    }
}
