// Location reporting: tracking state machine, background delivery and samples

pub mod delivery;
pub mod sample;

use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

use crate::config::{TrackingOptions, LOCATION_TASK_NAME};
use crate::error::{Error, Result};
use crate::permissions::{self, BatteryOptimization, LocationPermissions, PermissionKind};
use crate::platform::BackgroundTaskRegistry;
use crate::storage::TrackingFlag;

pub use delivery::LocationTask;
pub use sample::{LocationSample, LocationUpdate};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TrackingState {
    /// No background task registered
    Idle,
    /// Permission dialogs in flight
    Requesting,
    /// Task registered and the persisted flag is set
    Tracking,
    /// Explicit stop in progress
    Stopping,
}

/// Owns the decision of when the background location task runs.
///
/// Tracking counts as active only when the persisted flag is true *and* the
/// OS reports the task as registered. Start and stop are serialised; both are
/// idempotent.
pub struct LocationReporter {
    permissions: Arc<dyn LocationPermissions>,
    registry: Arc<dyn BackgroundTaskRegistry>,
    flag: TrackingFlag,
    battery: Option<Arc<dyn BatteryOptimization>>,
    options: TrackingOptions,
    state: RwLock<TrackingState>,
    transition: Mutex<()>,
}

impl LocationReporter {
    pub fn new(
        permissions: Arc<dyn LocationPermissions>,
        registry: Arc<dyn BackgroundTaskRegistry>,
        flag: TrackingFlag,
        battery: Option<Arc<dyn BatteryOptimization>>,
        options: TrackingOptions,
    ) -> Self {
        Self {
            permissions,
            registry,
            flag,
            battery,
            options,
            state: RwLock::new(TrackingState::Idle),
            transition: Mutex::new(()),
        }
    }

    pub async fn state(&self) -> TrackingState {
        *self.state.read().await
    }

    pub async fn is_tracking(&self) -> bool {
        self.state().await == TrackingState::Tracking
    }

    pub fn options(&self) -> &TrackingOptions {
        &self.options
    }

    async fn set_state(&self, next: TrackingState) {
        let mut state = self.state.write().await;
        if *state != next {
            log::debug!("Tracking state: {:?} -> {:?}", *state, next);
            *state = next;
        }
    }

    pub async fn start_tracking(&self) -> Result<()> {
        let _transition = self.transition.lock().await;

        if self.state().await == TrackingState::Tracking
            && self.registry.is_registered(LOCATION_TASK_NAME).await?
        {
            // Another context may have rewritten the flag meanwhile
            if !self.flag.get().await? {
                log::warn!("Tracking flag was cleared while the task kept running, restoring");
            }
            self.flag.set(true).await?;
            log::debug!("Tracking already active");
            return Ok(());
        }

        self.set_state(TrackingState::Requesting).await;

        match self.start_inner().await {
            Ok(()) => {
                self.set_state(TrackingState::Tracking).await;
                log::info!("Location tracking started");
                Ok(())
            }
            Err(e) => {
                self.set_state(TrackingState::Idle).await;
                log::warn!("Could not start location tracking: {}", e);
                Err(e)
            }
        }
    }

    async fn start_inner(&self) -> Result<()> {
        let status = permissions::request_permissions(self.permissions.as_ref()).await?;
        if !status.foreground.is_granted() {
            return Err(Error::PermissionDenied(PermissionKind::Foreground));
        }
        if !status.background.is_granted() {
            return Err(Error::PermissionDenied(PermissionKind::Background));
        }

        let newly_registered = if self.registry.is_registered(LOCATION_TASK_NAME).await? {
            false
        } else {
            self.registry.register(LOCATION_TASK_NAME, &self.options).await?;
            true
        };

        if let Err(e) = self.flag.set(true).await {
            if newly_registered {
                if let Err(undo) = self.registry.unregister(LOCATION_TASK_NAME).await {
                    log::warn!("Failed to roll back task registration: {}", undo);
                }
            }
            return Err(e);
        }

        if newly_registered && self.options.prompt_battery_exemption {
            if let Some(battery) = &self.battery {
                // The answer never blocks tracking
                match battery.prompt_exemption().await {
                    Ok(true) => log::info!("User opened battery optimization settings"),
                    Ok(false) => log::debug!("Battery optimization prompt declined"),
                    Err(e) => log::warn!("Battery optimization prompt failed: {}", e),
                }
            }
        }

        Ok(())
    }

    /// Safe to call when nothing is registered. Always ends in `Idle` with the
    /// flag cleared where storage allows.
    pub async fn stop_tracking(&self) -> Result<()> {
        let _transition = self.transition.lock().await;
        self.set_state(TrackingState::Stopping).await;

        let unregistered = match self.registry.is_registered(LOCATION_TASK_NAME).await {
            Ok(true) => self.registry.unregister(LOCATION_TASK_NAME).await,
            Ok(false) => {
                log::debug!("No location task registered");
                Ok(())
            }
            Err(e) => {
                log::warn!("Could not query task registration, unregistering anyway: {}", e);
                self.registry.unregister(LOCATION_TASK_NAME).await
            }
        };
        let persisted = self.flag.set(false).await;

        self.set_state(TrackingState::Idle).await;

        unregistered?;
        persisted?;
        log::info!("Location tracking stopped");
        Ok(())
    }

    /// Restart reconciliation: `Tracking` only when the OS registration and the
    /// persisted flag agree. A stale `true` flag is cleared; the registry must
    /// report registrations made by other processes, or a live tracker's flag
    /// would be cleared too.
    pub async fn reconcile(&self) -> Result<TrackingState> {
        let _transition = self.transition.lock().await;

        let registered = self.registry.is_registered(LOCATION_TASK_NAME).await?;
        let flagged = self.flag.get().await?;

        let state = if registered && flagged {
            TrackingState::Tracking
        } else {
            TrackingState::Idle
        };

        if flagged && !registered {
            log::warn!("Tracking flag set but no location task is registered, resetting");
            self.flag.set(false).await?;
        } else if registered && !flagged {
            log::warn!("Location task registered but tracking flag is off, treating as idle");
        }

        self.set_state(state).await;
        Ok(state)
    }
}
