use reqwest::{Client, Response};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

use crate::config::AgentConfig;
use crate::error::{Error, Result};
use crate::storage::CredentialStore;

/// Shared HTTP transport. Authenticated calls read the token from the
/// injected credential store on every request.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    credentials: Arc<dyn CredentialStore>,
}

impl ApiClient {
    pub fn new(config: &AgentConfig, credentials: Arc<dyn CredentialStore>) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .user_agent(format!("Beacon-Agent/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: config.server_url.trim_end_matches('/').to_string(),
            credentials,
        })
    }

    pub fn credentials(&self) -> &Arc<dyn CredentialStore> {
        &self.credentials
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    /// Stored token, or an authentication error without touching the network.
    pub async fn bearer_token(&self) -> Result<String> {
        self.credentials
            .get_token()
            .await?
            .ok_or_else(|| Error::authentication("Not authenticated"))
    }

    pub async fn get_with_auth(&self, endpoint: &str) -> Result<Response> {
        let token = self.bearer_token().await?;

        let response = self.client
            .get(self.url(endpoint))
            .bearer_auth(token)
            .send()
            .await?;

        Ok(response)
    }

    pub async fn post_with_auth<B: Serialize + ?Sized>(&self, endpoint: &str, body: &B) -> Result<Response> {
        let token = self.bearer_token().await?;

        let response = self.client
            .post(self.url(endpoint))
            .bearer_auth(token)
            .json(body)
            .send()
            .await?;

        Ok(response)
    }

    pub async fn get(&self, endpoint: &str) -> Result<Response> {
        let response = self.client.get(self.url(endpoint)).send().await?;
        Ok(response)
    }

    pub async fn post<B: Serialize + ?Sized>(&self, endpoint: &str, body: &B) -> Result<Response> {
        let response = self.client
            .post(self.url(endpoint))
            .json(body)
            .send()
            .await?;

        Ok(response)
    }
}

/// Pull a human-readable message out of an error body, if the backend sent one.
pub fn backend_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    ["message", "error"]
        .iter()
        .find_map(|field| value.get(*field).and_then(|v| v.as_str()))
        .map(|message| message.to_string())
        .filter(|message| !message.is_empty())
}

/// Pass 2xx responses through; turn anything else into `Error::Request`.
pub async fn ensure_success(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(Error::Request {
        status: status.as_u16(),
        message: backend_message(&body),
    })
}

/// Read a JSON body, reporting malformed content as a parsing error.
pub async fn read_json<T: serde::de::DeserializeOwned>(response: Response) -> Result<T> {
    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|e| Error::parsing(format!("unexpected response body: {}", e)))
}
