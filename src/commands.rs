use serde::{Deserialize, Serialize};

use crate::api::{ProviderSignIn, SignUpForm, SignUpOutcome, UserProfile};
use crate::error::Error;
use crate::platform::AuthBrowser;
use crate::sampling::TrackingState;
use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthStatus {
    pub is_authenticated: bool,
    pub server_url: String,
}

#[derive(Debug, Serialize)]
pub struct TrackingStatus {
    pub is_tracking: bool,
    pub state: TrackingState,
    pub interval_seconds: u64,
}

/// What the UI gets back when a command fails.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommandError {
    pub message: String,
    /// Session missing or rejected: send the user back to sign-in
    pub requires_login: bool,
}

impl From<Error> for CommandError {
    fn from(e: Error) -> Self {
        Self {
            requires_login: e.requires_login(),
            message: e.to_string(),
        }
    }
}

impl std::fmt::Display for CommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CommandError {}

pub type CommandResult<T> = Result<T, CommandError>;

pub async fn login(state: &AppState, request: LoginRequest) -> CommandResult<AuthStatus> {
    state.auth.login(request.email.trim(), &request.password).await?;
    get_auth_status(state).await
}

pub async fn signup(state: &AppState, form: SignUpForm) -> CommandResult<SignUpOutcome> {
    Ok(state.auth.sign_up(&form).await?)
}

pub async fn provider_login(state: &AppState, browser: &dyn AuthBrowser) -> CommandResult<ProviderSignIn> {
    Ok(state.auth.sign_in_with_provider(browser).await?)
}

/// Tracking stops before the token is cleared so no upload runs without a session.
pub async fn logout(state: &AppState) -> CommandResult<()> {
    log::info!("Logout: stopping location tracking");
    if let Err(e) = state.reporter.stop_tracking().await {
        log::warn!("Failed to stop tracking on logout: {}", e);
    }

    state.auth.logout().await?;
    Ok(())
}

pub async fn get_auth_status(state: &AppState) -> CommandResult<AuthStatus> {
    Ok(AuthStatus {
        is_authenticated: state.auth.is_authenticated().await?,
        server_url: state.config.server_url.clone(),
    })
}

/// Reconciles against the scheduler before reporting.
pub async fn get_tracking_status(state: &AppState) -> CommandResult<TrackingStatus> {
    let current = state.reporter.reconcile().await?;
    Ok(tracking_status(state, current))
}

pub async fn start_tracking(state: &AppState) -> CommandResult<TrackingStatus> {
    if !state.auth.is_authenticated().await? {
        return Err(Error::authentication("Not authenticated").into());
    }

    state.reporter.start_tracking().await?;
    Ok(tracking_status(state, state.reporter.state().await))
}

pub async fn stop_tracking(state: &AppState) -> CommandResult<TrackingStatus> {
    state.reporter.stop_tracking().await?;
    Ok(tracking_status(state, state.reporter.state().await))
}

pub async fn get_profile(state: &AppState) -> CommandResult<UserProfile> {
    Ok(state.profile.fetch().await?)
}

fn tracking_status(state: &AppState, current: TrackingState) -> TrackingStatus {
    TrackingStatus {
        is_tracking: current == TrackingState::Tracking,
        state: current,
        interval_seconds: state.reporter.options().interval.as_secs(),
    }
}
