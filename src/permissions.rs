use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PermissionStatus {
    Granted,
    Denied,
    Undetermined,
}

impl PermissionStatus {
    pub fn is_granted(&self) -> bool {
        matches!(self, PermissionStatus::Granted)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PermissionKind {
    Foreground,
    Background,
}

impl fmt::Display for PermissionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PermissionKind::Foreground => write!(f, "Foreground"),
            PermissionKind::Background => write!(f, "Background"),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct PermissionsStatus {
    pub foreground: PermissionStatus,
    pub background: PermissionStatus,
}

/// OS authorization dialogs for location access.
#[async_trait]
pub trait LocationPermissions: Send + Sync {
    async fn request_foreground(&self) -> Result<PermissionStatus>;

    async fn request_background(&self) -> Result<PermissionStatus>;

    /// Platforms that gate background access behind a second dialog return true.
    fn requires_background_grant(&self) -> bool;
}

/// Battery-optimization exemption prompt. Informational only.
#[async_trait]
pub trait BatteryOptimization: Send + Sync {
    /// Returns whether the user chose to open the exemption settings.
    async fn prompt_exemption(&self) -> Result<bool>;
}

/// Request every permission tracking needs and report what was granted.
/// The background dialog is skipped when foreground access was refused.
pub async fn request_permissions(permissions: &dyn LocationPermissions) -> Result<PermissionsStatus> {
    let foreground = permissions.request_foreground().await?;
    if !foreground.is_granted() {
        return Ok(PermissionsStatus { foreground, background: PermissionStatus::Undetermined });
    }

    let background = if permissions.requires_background_grant() {
        permissions.request_background().await?
    } else {
        PermissionStatus::Granted
    };

    Ok(PermissionsStatus { foreground, background })
}
