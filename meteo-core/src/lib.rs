//! Core library for the `meteo` refresh job.
//!
//! This crate defines:
//! - Configuration handling
//! - The static table of locations
//! - Forecast provider abstraction and the Open-Meteo client
//! - Document store abstraction, the Firestore client and an in-memory store
//! - The refresh job and its batch report
//!
//! It is used by `meteo-cli`, but can also be driven directly, e.g. from tests.

pub mod auth;
pub mod config;
pub mod error;
pub mod job;
pub mod locations;
pub mod model;
pub mod provider;
pub mod report;
pub mod store;

pub use config::{Config, ForecastConfig, StoreConfig};
pub use error::{AuthError, ProviderError, RefreshError, StoreError};
pub use job::{CollectionLayout, RefreshJob};
pub use model::{CurrentConditions, DailyForecast, DailySeries, ForecastPayload, Location};
pub use provider::{ForecastProvider, provider_from_config};
pub use report::{BatchReport, LocationOutcome, LocationRefresh};
pub use store::{Document, DocumentPath, DocumentStore, FieldValue};
