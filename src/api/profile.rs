use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::client::{ensure_success, read_json, ApiClient};
use crate::config::AgentConfig;
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

// Numeric database ids are accepted and kept as strings.
fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!("expected string or number id, got {}", other))),
    }
}

#[derive(Clone)]
pub struct ProfileClient {
    api: ApiClient,
    endpoint: String,
}

impl ProfileClient {
    pub fn new(config: &AgentConfig, api: ApiClient) -> Self {
        Self {
            api,
            endpoint: config.endpoints.user_profile.clone(),
        }
    }

    /// Fetched fresh on every call; nothing is cached here.
    pub async fn fetch(&self) -> Result<UserProfile> {
        let response = self.api.get_with_auth(&self.endpoint).await?;
        let response = ensure_success(response).await?;
        read_json(response).await
    }
}
