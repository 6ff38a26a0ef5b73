use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Error, Result};

pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:5454";
pub const LOCATION_TASK_NAME: &str = "background-location-task";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CredentialBackend {
    Database,
    Keyring,
}

impl std::str::FromStr for CredentialBackend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "database" | "db" => Ok(CredentialBackend::Database),
            "keyring" | "keychain" => Ok(CredentialBackend::Keyring),
            other => Err(Error::Config(format!("unknown credential backend '{}'", other))),
        }
    }
}

/// Location accuracy profile requested from the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Accuracy {
    Lowest,
    Low,
    Balanced,
    High,
    Highest,
}

/// Which reading of a delivered batch gets uploaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BatchPolicy {
    /// Reading with the most recent capture time
    Latest,
    /// First element in delivery order
    First,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiEndpoints {
    pub sign_in: String,
    pub sign_up: String,
    pub provider_url: String,
    pub provider_callback: String,
    pub location_create: String,
    pub user_profile: String,
}

impl Default for ApiEndpoints {
    fn default() -> Self {
        Self {
            sign_in: "/auth/signin".to_string(),
            sign_up: "/auth/signup".to_string(),
            provider_url: "/login/google".to_string(),
            provider_callback: "/login/google/callback".to_string(),
            location_create: "/api/location/create".to_string(),
            user_profile: "/api/user/user-profile".to_string(),
        }
    }
}

/// Options handed to the OS scheduler when the location task is registered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingOptions {
    pub interval: Duration,
    pub distance_filter_meters: f64,
    pub accuracy: Accuracy,
    pub shows_background_indicator: bool,
    pub notification_title: String,
    pub notification_body: String,
    pub batch_policy: BatchPolicy,
    pub prompt_battery_exemption: bool,
}

impl Default for TrackingOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(15 * 60),
            distance_filter_meters: 0.0,
            accuracy: Accuracy::Balanced,
            shows_background_indicator: true,
            notification_title: "Tracking Location".to_string(),
            notification_body: "Your location is being tracked in background".to_string(),
            batch_policy: BatchPolicy::Latest,
            prompt_battery_exemption: true,
        }
    }
}

/// Timing of the database lease that makes a desktop task registration
/// visible to every process sharing the data directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskLease {
    /// How often the owning process renews the lease
    pub refresh: Duration,
    /// Age after which an unrenewed lease counts as abandoned
    pub ttl: Duration,
}

impl Default for TaskLease {
    fn default() -> Self {
        Self {
            refresh: Duration::from_secs(5),
            ttl: Duration::from_secs(20),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    pub server_url: String,
    pub endpoints: ApiEndpoints,
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
    pub data_dir: Option<PathBuf>,
    pub credential_backend: CredentialBackend,
    pub tracking: TrackingOptions,
    pub fixed_location: (f64, f64),
    /// Answer the desktop host gives to location permission requests
    pub location_permission_granted: bool,
    pub task_lease: TaskLease,
    pub oauth_redirect_uri: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            endpoints: ApiEndpoints::default(),
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            data_dir: None,
            credential_backend: CredentialBackend::Database,
            tracking: TrackingOptions::default(),
            fixed_location: (0.0, 0.0),
            location_permission_granted: true,
            task_lease: TaskLease::default(),
            oauth_redirect_uri: "beacon://auth".to_string(),
        }
    }
}

/// Whole seconds above zero; a zero timeout would fail every request.
fn timeout_secs(raw: &str) -> Option<Duration> {
    raw.trim()
        .parse::<u64>()
        .ok()
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs)
}

pub fn is_dev_mode() -> bool {
    std::env::var("BEACON_DEV_SHORT_INTERVALS").is_ok()
}

impl AgentConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("BEACON_SERVER_URL") {
            if !val.trim().is_empty() {
                config.server_url = val.trim().trim_end_matches('/').to_string();
            }
        }

        if let Ok(val) = std::env::var("BEACON_REQUEST_TIMEOUT_SECS") {
            match timeout_secs(&val) {
                Some(timeout) => config.request_timeout = timeout,
                None => log::warn!("Ignoring BEACON_REQUEST_TIMEOUT_SECS={:?}", val),
            }
        }

        if let Ok(val) = std::env::var("BEACON_CONNECT_TIMEOUT_SECS") {
            match timeout_secs(&val) {
                Some(timeout) => config.connect_timeout = timeout,
                None => log::warn!("Ignoring BEACON_CONNECT_TIMEOUT_SECS={:?}", val),
            }
        }

        if let Ok(val) = std::env::var("BEACON_LOCATION_PERMISSION") {
            config.location_permission_granted = !matches!(
                val.trim().to_ascii_lowercase().as_str(),
                "denied" | "deny" | "false" | "0"
            );
        }

        if let Ok(val) = std::env::var("BEACON_DATA_DIR") {
            config.data_dir = Some(PathBuf::from(val));
        }

        if let Ok(val) = std::env::var("BEACON_CREDENTIAL_BACKEND") {
            match val.parse() {
                Ok(backend) => config.credential_backend = backend,
                Err(e) => log::warn!("{}, using database", e),
            }
        }

        if let Ok(val) = std::env::var("BEACON_PROMPT_BATTERY") {
            config.tracking.prompt_battery_exemption = val.parse().unwrap_or(true);
        }

        if let Ok(val) = std::env::var("BEACON_FIXED_LATITUDE") {
            config.fixed_location.0 = val.parse().unwrap_or(0.0);
        }

        if let Ok(val) = std::env::var("BEACON_FIXED_LONGITUDE") {
            config.fixed_location.1 = val.parse().unwrap_or(0.0);
        }

        if let Ok(val) = std::env::var("BEACON_OAUTH_REDIRECT") {
            config.oauth_redirect_uri = val;
        }

        if is_dev_mode() {
            config.tracking.interval = Duration::from_secs(10);
        }

        config
    }

    /// Directory holding the local database.
    pub fn resolve_data_dir(&self) -> Result<PathBuf> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => {
                let mut path = dirs::data_dir()
                    .ok_or_else(|| Error::Config("Failed to get data directory".to_string()))?;
                path.push("Beacon");
                Ok(path)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_tracking_options() {
        let options = TrackingOptions::default();

        assert_eq!(options.interval, Duration::from_secs(900));
        assert_eq!(options.distance_filter_meters, 0.0);
        assert_eq!(options.accuracy, Accuracy::Balanced);
        assert_eq!(options.batch_policy, BatchPolicy::Latest);
    }

    #[test]
    fn test_timeout_secs_rejects_zero_and_garbage() {
        assert_eq!(timeout_secs("45"), Some(Duration::from_secs(45)));
        assert_eq!(timeout_secs(" 5 "), Some(Duration::from_secs(5)));
        assert_eq!(timeout_secs("0"), None);
        assert_eq!(timeout_secs("-3"), None);
        assert_eq!(timeout_secs("soon"), None);
    }

    #[test]
    fn test_credential_backend_parse() {
        assert_eq!("keyring".parse::<CredentialBackend>().unwrap(), CredentialBackend::Keyring);
        assert_eq!(" Database ".parse::<CredentialBackend>().unwrap(), CredentialBackend::Database);
        assert!("vault".parse::<CredentialBackend>().is_err());
    }
}
