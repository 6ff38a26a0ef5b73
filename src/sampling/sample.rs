use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A single reading from the location provider.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationSample {
    pub latitude: f64,
    pub longitude: f64,
    /// Capture time in epoch milliseconds
    pub captured_at_ms: i64,
}

/// Body of `POST /api/location/create`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationUpdate {
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp: String,
}

impl LocationSample {
    pub fn new(latitude: f64, longitude: f64, captured_at_ms: i64) -> Self {
        Self { latitude, longitude, captured_at_ms }
    }

    pub fn now(latitude: f64, longitude: f64) -> Self {
        Self::new(latitude, longitude, Utc::now().timestamp_millis())
    }

    pub fn captured_at(&self) -> Result<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.captured_at_ms)
            .single()
            .ok_or_else(|| Error::parsing(format!("invalid capture time {}", self.captured_at_ms)))
    }

    /// ISO-8601 UTC with millisecond precision, e.g. `2024-01-01T00:00:00.000Z`.
    pub fn timestamp(&self) -> Result<String> {
        Ok(self.captured_at()?.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn to_update(&self) -> Result<LocationUpdate> {
        Ok(LocationUpdate {
            latitude: self.latitude,
            longitude: self.longitude,
            timestamp: self.timestamp()?,
        })
    }
}
