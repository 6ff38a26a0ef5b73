use async_trait::async_trait;

use super::sample::LocationSample;
use crate::api::LocationClient;
use crate::config::BatchPolicy;
use crate::error::{Error, Result};
use crate::platform::{LocationTaskHandler, TaskDelivery};

/// Background handler that forwards one reading per invocation to the backend.
///
/// Nothing is buffered or retried: a failed upload is logged and the sample
/// is dropped. The token is read from the credential store on every call, so
/// the handler shares no in-memory session with the foreground.
pub struct LocationTask {
    client: LocationClient,
    policy: BatchPolicy,
}

impl LocationTask {
    pub fn new(client: LocationClient, policy: BatchPolicy) -> Self {
        Self { client, policy }
    }

    /// Pick the reading to upload from a delivered batch.
    pub fn select_sample(batch: &[LocationSample], policy: BatchPolicy) -> Option<LocationSample> {
        match policy {
            BatchPolicy::Latest => batch.iter().max_by_key(|sample| sample.captured_at_ms).copied(),
            BatchPolicy::First => batch.first().copied(),
        }
    }

    /// Returns the uploaded sample, or `None` for an empty batch.
    pub async fn deliver(&self, delivery: TaskDelivery) -> Result<Option<LocationSample>> {
        let batch = match delivery {
            TaskDelivery::Locations(batch) => batch,
            TaskDelivery::Failed(reason) => return Err(Error::BackgroundTask(reason)),
        };

        let Some(sample) = Self::select_sample(&batch, self.policy) else {
            return Ok(None);
        };

        self.client.update(&sample).await?;
        Ok(Some(sample))
    }
}

#[async_trait]
impl LocationTaskHandler for LocationTask {
    async fn on_delivery(&self, delivery: TaskDelivery) {
        match self.deliver(delivery).await {
            Ok(Some(sample)) => {
                log::info!("✓ Location sent ({:.5}, {:.5})", sample.latitude, sample.longitude);
            }
            Ok(None) => log::debug!("Location task invoked with an empty batch"),
            Err(e @ Error::BackgroundTask(_)) => log::error!("Location task error: {}", e),
            Err(e) => log::error!("Failed to send location update: {}", e),
        }
    }
}
