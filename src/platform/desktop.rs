use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::oneshot;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::MissedTickBehavior;
use uuid::Uuid;

use super::{
    AuthBrowser, BackgroundTaskRegistry, BatteryOptimization, BrowserOutcome, LocationPermissions,
    LocationSource, LocationTaskHandler, PermissionStatus, TaskDelivery,
};
use crate::config::{Accuracy, TaskLease, TrackingOptions};
use crate::error::{Error, Result};
use crate::sampling::sample::LocationSample;
use crate::storage::Database;

const LEASE_KEY_PREFIX: &str = "task_lease:";

/// Desktop hosts have no location dialogs; access is granted up front.
pub struct DesktopPermissions {
    granted: bool,
}

impl DesktopPermissions {
    pub fn new(granted: bool) -> Self {
        Self { granted }
    }
}

#[async_trait]
impl LocationPermissions for DesktopPermissions {
    async fn request_foreground(&self) -> Result<PermissionStatus> {
        Ok(if self.granted { PermissionStatus::Granted } else { PermissionStatus::Denied })
    }

    async fn request_background(&self) -> Result<PermissionStatus> {
        self.request_foreground().await
    }

    fn requires_background_grant(&self) -> bool {
        false
    }
}

pub struct LoggingBatteryPrompt;

#[async_trait]
impl BatteryOptimization for LoggingBatteryPrompt {
    async fn prompt_exemption(&self) -> Result<bool> {
        log::info!(
            "To ensure reliable background location tracking, disable battery optimization for this app"
        );
        Ok(false)
    }
}

/// Serves a configured coordinate stamped with the current time.
pub struct FixedLocationSource {
    latitude: f64,
    longitude: f64,
}

impl FixedLocationSource {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }
}

#[async_trait]
impl LocationSource for FixedLocationSource {
    async fn current_location(&self, _accuracy: Accuracy) -> Result<Vec<LocationSample>> {
        Ok(vec![LocationSample::now(self.latitude, self.longitude)])
    }
}

/// Desktop scheduler: each registered task is a tokio interval loop that
/// reads the location source and invokes the handler.
///
/// The registration itself is a lease row in the shared database, renewed by
/// the owning process. Any process on the same data directory sees the task
/// as registered while the lease is fresh, and unregistering from any of them
/// releases the lease, which stops the loop in the owner.
pub struct IntervalTaskRegistry {
    db: Database,
    lease: TaskLease,
    source: Arc<dyn LocationSource>,
    handler: Arc<dyn LocationTaskHandler>,
    tasks: Mutex<HashMap<String, ScheduledTask>>,
}

struct ScheduledTask {
    shutdown: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

fn lease_key(task_name: &str) -> String {
    format!("{}{}", LEASE_KEY_PREFIX, task_name)
}

impl IntervalTaskRegistry {
    pub fn new(db: Database, source: Arc<dyn LocationSource>, handler: Arc<dyn LocationTaskHandler>) -> Self {
        Self {
            db,
            lease: TaskLease::default(),
            source,
            handler,
            tasks: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_lease(mut self, lease: TaskLease) -> Self {
        self.lease = lease;
        self
    }

    fn lock_tasks(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, ScheduledTask>>> {
        self.tasks
            .lock()
            .map_err(|_| Error::platform("task registry lock poisoned"))
    }

    fn take_local(&self, task_name: &str) -> Result<Option<ScheduledTask>> {
        Ok(self.lock_tasks()?.remove(task_name))
    }

    fn lease_is_live(&self, task_name: &str) -> Result<bool> {
        Ok(match self.db.get_entry(&lease_key(task_name))? {
            // A renewal stamped ahead of our clock still counts as fresh
            Some((_, renewed_at)) => (Utc::now() - renewed_at)
                .to_std()
                .map_or(true, |age| age < self.lease.ttl),
            None => false,
        })
    }
}

/// Signals the loop and waits until it and any in-flight delivery are gone.
async fn stop_scheduled(task_name: &str, task: ScheduledTask) {
    // Err means the loop already exited on its own
    let _ = task.shutdown.send(());
    if let Err(e) = task.handle.await {
        log::error!("{} did not shut down cleanly: {}", task_name, e);
    }
}

struct TaskRun {
    task_name: String,
    owner: String,
    options: TrackingOptions,
    lease: TaskLease,
    db: Database,
    source: Arc<dyn LocationSource>,
    handler: Arc<dyn LocationTaskHandler>,
}

async fn run_task(run: TaskRun, mut shutdown: oneshot::Receiver<()>) {
    let TaskRun { task_name, owner, options, lease, db, source, handler } = run;
    let key = lease_key(&task_name);

    let mut interval = tokio::time::interval(options.interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut renew = tokio::time::interval(lease.refresh);
    renew.set_missed_tick_behavior(MissedTickBehavior::Delay);

    // Handlers run on their own tasks so a panic cannot take the schedule
    // down. At most one is in flight; the next tick waits for it.
    let mut in_flight: JoinSet<()> = JoinSet::new();

    log::info!("{} starting (interval: {}s)", task_name, options.interval.as_secs());

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = renew.tick() => match db.touch(&key, &owner) {
                Ok(true) => {}
                Ok(false) => {
                    log::warn!("{} lease released elsewhere, stopping", task_name);
                    break;
                }
                Err(e) => log::warn!("{} could not renew its lease: {}", task_name, e),
            },
            _ = interval.tick(), if in_flight.is_empty() => {
                let source = source.clone();
                let handler = handler.clone();
                let accuracy = options.accuracy;
                in_flight.spawn(async move {
                    let delivery = match source.current_location(accuracy).await {
                        Ok(locations) => TaskDelivery::Locations(locations),
                        Err(e) => TaskDelivery::Failed(e.to_string()),
                    };
                    handler.on_delivery(delivery).await;
                });
            }
            Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                if let Err(e) = joined {
                    let err = Error::BackgroundTask(e.to_string());
                    log::error!("{} invocation failed: {}", task_name, err);
                }
            }
        }
    }

    // Aborts and awaits whatever delivery is still running
    in_flight.shutdown().await;
    log::info!("{} stopped", task_name);
}

#[async_trait]
impl BackgroundTaskRegistry for IntervalTaskRegistry {
    async fn is_registered(&self, task_name: &str) -> Result<bool> {
        self.lease_is_live(task_name)
    }

    async fn register(&self, task_name: &str, options: &TrackingOptions) -> Result<()> {
        if options.interval.is_zero() {
            return Err(Error::Config("tracking interval must be non-zero".to_string()));
        }
        if self.lease.refresh.is_zero() {
            return Err(Error::Config("lease refresh must be non-zero".to_string()));
        }

        if self.lease_is_live(task_name)? {
            log::debug!("{} already registered", task_name);
            return Ok(());
        }

        // A local loop whose lease lapsed is replaced
        if let Some(stale) = self.take_local(task_name)? {
            stop_scheduled(task_name, stale).await;
        }

        let owner = Uuid::new_v4().to_string();
        self.db.set(&lease_key(task_name), &owner)?;

        let (shutdown, receiver) = oneshot::channel();
        let run = TaskRun {
            task_name: task_name.to_string(),
            owner,
            options: options.clone(),
            lease: self.lease,
            db: self.db.clone(),
            source: self.source.clone(),
            handler: self.handler.clone(),
        };
        let handle = tokio::spawn(run_task(run, receiver));
        self.lock_tasks()?
            .insert(task_name.to_string(), ScheduledTask { shutdown, handle });

        Ok(())
    }

    async fn unregister(&self, task_name: &str) -> Result<()> {
        match self.take_local(task_name)? {
            Some(task) => stop_scheduled(task_name, task).await,
            None => log::debug!("{} has no loop in this process", task_name),
        }
        self.db.remove(&lease_key(task_name))
    }
}

impl Drop for IntervalTaskRegistry {
    fn drop(&mut self) {
        // Lapsed leases expire on their own
        if let Ok(tasks) = self.tasks.get_mut() {
            for (_, task) in tasks.drain() {
                task.handle.abort();
            }
        }
    }
}

/// Prints the sign-in URL and reads the final redirect URL from stdin.
/// An empty line cancels the session.
pub struct ConsoleBrowser;

#[async_trait]
impl AuthBrowser for ConsoleBrowser {
    async fn open_auth_session(&self, url: &str, redirect_uri: &str) -> Result<BrowserOutcome> {
        println!("Open this URL to sign in:\n\n  {}\n", url);
        println!("Paste the {} redirect URL (empty line to cancel):", redirect_uri);

        let mut line = String::new();
        let read = BufReader::new(tokio::io::stdin())
            .read_line(&mut line)
            .await
            .map_err(|e| Error::platform(format!("failed to read redirect URL: {}", e)))?;

        if read == 0 {
            return Ok(BrowserOutcome::Dismissed);
        }

        let line = line.trim();
        if line.is_empty() {
            Ok(BrowserOutcome::Cancelled)
        } else {
            Ok(BrowserOutcome::Success(line.to_string()))
        }
    }
}
