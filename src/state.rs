use std::sync::Arc;

use crate::api::{ApiClient, AuthClient, LocationClient, ProfileClient};
use crate::config::AgentConfig;
use crate::error::Result;
use crate::permissions::{BatteryOptimization, LocationPermissions};
use crate::platform::desktop::{DesktopPermissions, FixedLocationSource, IntervalTaskRegistry, LoggingBatteryPrompt};
use crate::platform::{BackgroundTaskRegistry, LocationSource};
use crate::sampling::{LocationReporter, LocationTask};
use crate::storage::{secure_store, CredentialStore, Database, TrackingFlag};

/// Every service the commands need, wired once with explicit dependencies.
pub struct AppState {
    pub config: AgentConfig,
    pub db: Database,
    pub credentials: Arc<dyn CredentialStore>,
    pub auth: AuthClient,
    pub profile: ProfileClient,
    pub reporter: LocationReporter,
}

impl AppState {
    /// Desktop wiring: configured database and credential backend, fixed
    /// location source and the in-process scheduler.
    pub fn new(config: AgentConfig) -> Result<Self> {
        let db = Database::open(&config.resolve_data_dir()?)?;
        let credentials = secure_store::credential_store_from_config(&config, &db);
        let (latitude, longitude) = config.fixed_location;
        let granted = config.location_permission_granted;

        Self::with_platform(
            config,
            db,
            credentials,
            Arc::new(DesktopPermissions::new(granted)),
            Arc::new(FixedLocationSource::new(latitude, longitude)),
            Some(Arc::new(LoggingBatteryPrompt)),
        )
    }

    pub fn with_platform(
        config: AgentConfig,
        db: Database,
        credentials: Arc<dyn CredentialStore>,
        permissions: Arc<dyn LocationPermissions>,
        source: Arc<dyn LocationSource>,
        battery: Option<Arc<dyn BatteryOptimization>>,
    ) -> Result<Self> {
        let api = ApiClient::new(&config, credentials.clone())?;

        let task = LocationTask::new(LocationClient::new(&config, api.clone()), config.tracking.batch_policy);
        let registry: Arc<dyn BackgroundTaskRegistry> = Arc::new(
            IntervalTaskRegistry::new(db.clone(), source, Arc::new(task)).with_lease(config.task_lease),
        );

        let reporter = LocationReporter::new(
            permissions,
            registry,
            TrackingFlag::new(db.clone()),
            battery,
            config.tracking.clone(),
        );

        Ok(Self {
            auth: AuthClient::new(&config, api.clone()),
            profile: ProfileClient::new(&config, api),
            reporter,
            credentials,
            db,
            config,
        })
    }
}
