#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

use beacon_agent_lib::api::ApiClient;
use beacon_agent_lib::config::{AgentConfig, TrackingOptions};
use beacon_agent_lib::permissions::{BatteryOptimization, LocationPermissions, PermissionStatus};
use beacon_agent_lib::platform::BackgroundTaskRegistry;
use beacon_agent_lib::sampling::LocationReporter;
use beacon_agent_lib::storage::{CredentialStore, Database, DatabaseCredentialStore, TrackingFlag};
use beacon_agent_lib::{Error, Result};

pub struct TestEnv {
    // Keeps the database directory alive for the test
    pub dir: TempDir,
    pub db: Database,
    pub credentials: Arc<dyn CredentialStore>,
    pub config: AgentConfig,
}

impl TestEnv {
    pub fn new(server_url: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(dir.path()).unwrap();
        let credentials: Arc<dyn CredentialStore> = Arc::new(DatabaseCredentialStore::new(db.clone()));
        let config = AgentConfig {
            server_url: server_url.to_string(),
            request_timeout: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(2),
            data_dir: Some(dir.path().to_path_buf()),
            ..Default::default()
        };

        Self { dir, db, credentials, config }
    }

    pub fn offline() -> Self {
        Self::new("http://127.0.0.1:9")
    }

    pub fn api(&self) -> ApiClient {
        ApiClient::new(&self.config, self.credentials.clone()).unwrap()
    }

    pub fn flag(&self) -> TrackingFlag {
        TrackingFlag::new(self.db.clone())
    }
}

pub struct FakePermissions {
    pub foreground: PermissionStatus,
    pub background: PermissionStatus,
    pub requires_background: bool,
    pub background_requests: AtomicUsize,
}

impl FakePermissions {
    pub fn granted() -> Self {
        Self::with(PermissionStatus::Granted, PermissionStatus::Granted, true)
    }

    pub fn with(foreground: PermissionStatus, background: PermissionStatus, requires_background: bool) -> Self {
        Self {
            foreground,
            background,
            requires_background,
            background_requests: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl LocationPermissions for FakePermissions {
    async fn request_foreground(&self) -> Result<PermissionStatus> {
        Ok(self.foreground)
    }

    async fn request_background(&self) -> Result<PermissionStatus> {
        self.background_requests.fetch_add(1, Ordering::SeqCst);
        Ok(self.background)
    }

    fn requires_background_grant(&self) -> bool {
        self.requires_background
    }
}

#[derive(Default)]
pub struct FakeRegistry {
    pub registered: Mutex<HashSet<String>>,
    pub register_calls: AtomicUsize,
    pub unregister_calls: AtomicUsize,
    pub fail_unregister: AtomicBool,
}

impl FakeRegistry {
    pub fn with_registered(task_name: &str) -> Self {
        let registry = Self::default();
        registry.registered.lock().unwrap().insert(task_name.to_string());
        registry
    }

    pub fn registrations(&self) -> usize {
        self.register_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BackgroundTaskRegistry for FakeRegistry {
    async fn is_registered(&self, task_name: &str) -> Result<bool> {
        Ok(self.registered.lock().unwrap().contains(task_name))
    }

    async fn register(&self, task_name: &str, _options: &TrackingOptions) -> Result<()> {
        self.register_calls.fetch_add(1, Ordering::SeqCst);
        self.registered.lock().unwrap().insert(task_name.to_string());
        Ok(())
    }

    async fn unregister(&self, task_name: &str) -> Result<()> {
        self.unregister_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_unregister.load(Ordering::SeqCst) {
            return Err(Error::platform("scheduler unavailable"));
        }
        self.registered.lock().unwrap().remove(task_name);
        Ok(())
    }
}

pub struct FakeBattery {
    pub accept: bool,
    pub prompts: AtomicUsize,
}

impl FakeBattery {
    pub fn new(accept: bool) -> Self {
        Self { accept, prompts: AtomicUsize::new(0) }
    }
}

#[async_trait]
impl BatteryOptimization for FakeBattery {
    async fn prompt_exemption(&self) -> Result<bool> {
        self.prompts.fetch_add(1, Ordering::SeqCst);
        Ok(self.accept)
    }
}

pub fn reporter(
    env: &TestEnv,
    permissions: Arc<FakePermissions>,
    registry: Arc<FakeRegistry>,
    battery: Option<Arc<FakeBattery>>,
) -> LocationReporter {
    LocationReporter::new(
        permissions,
        registry,
        env.flag(),
        battery.map(|b| b as Arc<dyn BatteryOptimization>),
        TrackingOptions::default(),
    )
}
