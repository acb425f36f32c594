use chrono::{DateTime, Utc};
use std::fmt;

use crate::error::RefreshError;

/// What a successful refresh wrote for one location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocationRefresh {
    /// Forecast documents written (at most seven).
    pub forecast_days: usize,
    /// Length of the `daily.time` series returned by the API.
    pub days_available: usize,
}

#[derive(Debug)]
pub struct LocationOutcome {
    pub location: String,
    pub result: Result<LocationRefresh, RefreshError>,
}

impl LocationOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

impl fmt::Display for LocationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.result {
            Ok(_) => write!(f, "✅ {}: OK", self.location),
            Err(err) => write!(f, "⚠️ {}: {}", self.location, err),
        }
    }
}

#[derive(Debug)]
pub struct BatchReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub outcomes: Vec<LocationOutcome>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    pub fn is_complete_success(&self) -> bool {
        self.failed() == 0
    }

    pub fn failures(&self) -> impl Iterator<Item = &LocationOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let elapsed = self.finished_at - self.started_at;
        write!(
            f,
            "Weather refresh complete: {} ok, {} failed in {:.1}s",
            self.succeeded(),
            self.failed(),
            elapsed.num_milliseconds() as f64 / 1000.0
        )
    }
}
