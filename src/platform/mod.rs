//! Seams to the operating system: background scheduling, location readings
//! and the browser used for provider sign-in. `desktop` provides in-process
//! implementations so the agent runs without a mobile OS.

pub mod desktop;

use async_trait::async_trait;

use crate::config::{Accuracy, TrackingOptions};
use crate::error::Result;
use crate::sampling::sample::LocationSample;

pub use crate::permissions::{BatteryOptimization, LocationPermissions, PermissionKind, PermissionStatus};

/// What the scheduler hands to the task on each invocation.
#[derive(Debug, Clone)]
pub enum TaskDelivery {
    Locations(Vec<LocationSample>),
    /// The OS could not produce a reading for this invocation
    Failed(String),
}

/// Callback run by the scheduler on its own execution context. Must always
/// complete; failures are handled inside.
#[async_trait]
pub trait LocationTaskHandler: Send + Sync {
    async fn on_delivery(&self, delivery: TaskDelivery);
}

/// OS-level registration of the recurring location task.
#[async_trait]
pub trait BackgroundTaskRegistry: Send + Sync {
    async fn is_registered(&self, task_name: &str) -> Result<bool>;

    async fn register(&self, task_name: &str, options: &TrackingOptions) -> Result<()>;

    async fn unregister(&self, task_name: &str) -> Result<()>;
}

#[async_trait]
pub trait LocationSource: Send + Sync {
    async fn current_location(&self, accuracy: Accuracy) -> Result<Vec<LocationSample>>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrowserOutcome {
    /// The session ended on the redirect URL
    Success(String),
    Cancelled,
    Dismissed,
}

/// User-facing browser session for the identity-provider flow.
#[async_trait]
pub trait AuthBrowser: Send + Sync {
    async fn open_auth_session(&self, url: &str, redirect_uri: &str) -> Result<BrowserOutcome>;
}
