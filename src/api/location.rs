use super::client::{ensure_success, ApiClient};
use crate::config::AgentConfig;
use crate::error::Result;
use crate::sampling::sample::LocationSample;

#[derive(Clone)]
pub struct LocationClient {
    api: ApiClient,
    endpoint: String,
}

impl LocationClient {
    pub fn new(config: &AgentConfig, api: ApiClient) -> Self {
        Self {
            api,
            endpoint: config.endpoints.location_create.clone(),
        }
    }

    /// Upload one sample. Fails with an authentication error before any
    /// request when no token is stored.
    pub async fn update(&self, sample: &LocationSample) -> Result<()> {
        let update = sample.to_update()?;

        let response = self.api.post_with_auth(&self.endpoint, &update).await?;
        ensure_success(response).await?;

        log::debug!("Location update accepted ({})", update.timestamp);
        Ok(())
    }
}
