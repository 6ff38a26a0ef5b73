use super::database::Database;
use crate::error::Result;

const TRACKING_KEY: &str = "isTracking";

/// Persisted half of the tracking state. The other half is the OS task registration.
#[derive(Debug, Clone)]
pub struct TrackingFlag {
    db: Database,
}

impl TrackingFlag {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Anything other than a stored `"true"` reads as not tracking.
    pub async fn get(&self) -> Result<bool> {
        Ok(self.db.get(TRACKING_KEY)?.as_deref() == Some("true"))
    }

    pub async fn set(&self, tracking: bool) -> Result<()> {
        self.db.set(TRACKING_KEY, if tracking { "true" } else { "false" })
    }
}
