use reqwest::header::{HeaderMap, AUTHORIZATION};
use reqwest::Response;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use url::Url;

use super::client::{backend_message, ensure_success, read_json, ApiClient};
use crate::config::{AgentConfig, ApiEndpoints};
use crate::error::{Error, Result};
use crate::platform::{AuthBrowser, BrowserOutcome};
use crate::utils::validation::{non_empty, validate_email, validate_phone};

/// Body fields checked, in order, when the token is not in the header.
const TOKEN_BODY_FIELDS: [&str; 3] = ["jwt", "token", "accessToken"];

#[derive(Serialize)]
struct LoginCredentials<'a> {
    email: &'a str,
    password: &'a str,
}

/// Registration fields as entered by the user.
#[derive(Debug, Clone, Default)]
pub struct SignUpForm {
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

/// Body of `POST /auth/signup`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUpCredentials {
    pub email: String,
    pub password: String,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

impl SignUpForm {
    pub fn validate(&self) -> Result<SignUpCredentials> {
        if self.password != self.confirm_password {
            return Err(Error::validation("Passwords do not match"));
        }

        let email = self.email.trim();
        if !validate_email(email) {
            return Err(Error::validation("Please enter a valid email address"));
        }

        let phone = non_empty(&self.phone);
        if !validate_phone(phone.as_deref().unwrap_or_default()) {
            return Err(Error::validation("Phone number must be 10 digits"));
        }

        Ok(SignUpCredentials {
            email: email.to_string(),
            password: self.password.clone(),
            full_name: non_empty(&self.full_name),
            phone,
            address: non_empty(&self.address),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignUpOutcome {
    /// The backend returned a token and it was stored
    SignedIn,
    /// Account exists; the user still has to sign in
    AccountCreated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderSignIn {
    SignedIn,
    Cancelled,
}

#[derive(Deserialize)]
struct ProviderUrlResponse {
    url: String,
}

fn bearer_from_headers(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then(|| token.to_string())
}

fn token_from_body(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    TOKEN_BODY_FIELDS
        .iter()
        .find_map(|field| value.get(*field).and_then(|v| v.as_str()))
        .filter(|token| !token.is_empty())
        .map(|token| token.to_string())
}

/// Header first, then the JSON body. Used by every flow that can issue a token.
async fn extract_token(response: Response) -> Result<Option<String>> {
    if let Some(token) = bearer_from_headers(response.headers()) {
        return Ok(Some(token));
    }

    let body = response.text().await?;
    Ok(token_from_body(&body))
}

pub struct AuthClient {
    api: ApiClient,
    endpoints: ApiEndpoints,
    redirect_uri: String,
}

impl AuthClient {
    pub fn new(config: &AgentConfig, api: ApiClient) -> Self {
        Self {
            api,
            endpoints: config.endpoints.clone(),
            redirect_uri: config.oauth_redirect_uri.clone(),
        }
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<()> {
        log::info!("Sign-in attempt started");

        let response = self.api
            .post(&self.endpoints.sign_in, &LoginCredentials { email, password })
            .await?;

        if !response.status().is_success() {
            log::warn!("Sign-in rejected with status {}", response.status());
            return Err(Error::authentication("Invalid credentials"));
        }

        let token = extract_token(response)
            .await?
            .ok_or_else(|| Error::authentication("Sign-in response did not include a token"))?;

        self.api.credentials().set_token(&token).await?;
        log::info!("Sign-in successful");
        Ok(())
    }

    /// Validates the form locally before anything is sent.
    pub async fn sign_up(&self, form: &SignUpForm) -> Result<SignUpOutcome> {
        let credentials = form.validate()?;

        let response = self.api.post(&self.endpoints.sign_up, &credentials).await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            log::warn!("Sign-up rejected with status {}", status);
            return Err(Error::Validation(
                backend_message(&body).unwrap_or_else(|| "Failed to create account".to_string()),
            ));
        }

        match extract_token(response).await? {
            Some(token) => {
                self.api.credentials().set_token(&token).await?;
                Ok(SignUpOutcome::SignedIn)
            }
            None => Ok(SignUpOutcome::AccountCreated),
        }
    }

    /// Local only; never needs the network.
    pub async fn logout(&self) -> Result<()> {
        self.api.credentials().clear_token().await?;
        log::info!("Signed out");
        Ok(())
    }

    pub async fn get_token(&self) -> Result<Option<String>> {
        self.api.credentials().get_token().await
    }

    pub async fn is_authenticated(&self) -> Result<bool> {
        Ok(self.get_token().await?.is_some())
    }

    pub async fn provider_sign_in_url(&self) -> Result<String> {
        let response = ensure_success(self.api.get(&self.endpoints.provider_url).await?).await?;
        let body: ProviderUrlResponse = read_json(response).await?;
        Ok(body.url)
    }

    /// Runs the identity-provider flow through a browser session. A session the
    /// user closes is reported as `Cancelled`, not as an error.
    pub async fn sign_in_with_provider(&self, browser: &dyn AuthBrowser) -> Result<ProviderSignIn> {
        let url = self.provider_sign_in_url().await?;

        match browser.open_auth_session(&url, &self.redirect_uri).await? {
            BrowserOutcome::Success(redirect_url) => {
                self.complete_provider_sign_in(&redirect_url).await?;
                Ok(ProviderSignIn::SignedIn)
            }
            BrowserOutcome::Cancelled | BrowserOutcome::Dismissed => {
                log::info!("Provider sign-in cancelled by user");
                Ok(ProviderSignIn::Cancelled)
            }
        }
    }

    /// Store the token carried by the redirect, exchanging a code first if needed.
    pub async fn complete_provider_sign_in(&self, redirect_url: &str) -> Result<()> {
        let url = Url::parse(redirect_url)?;

        let mut params: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        if let Some(fragment) = url.fragment() {
            params.extend(url::form_urlencoded::parse(fragment.as_bytes()).into_owned());
        }
        let param = |name: &str| {
            params
                .iter()
                .find(|(key, value)| key == name && !value.is_empty())
                .map(|(_, value)| value.clone())
        };

        if let Some(error) = param("error") {
            return Err(Error::authentication(format!("Provider sign-in failed: {}", error)));
        }

        let token = match (param("token"), param("code")) {
            (Some(token), _) => token,
            (None, Some(code)) => self.exchange_code(&code).await?,
            (None, None) => {
                return Err(Error::authentication("Provider redirect did not include a code or token"))
            }
        };

        self.api.credentials().set_token(&token).await?;
        log::info!("Provider sign-in successful");
        Ok(())
    }

    async fn exchange_code(&self, code: &str) -> Result<String> {
        let response = self.api
            .post(&self.endpoints.provider_callback, &json!({ "code": code }))
            .await?;

        if !response.status().is_success() {
            log::warn!("Provider code exchange rejected with status {}", response.status());
            return Err(Error::authentication("Authentication failed"));
        }

        extract_token(response)
            .await?
            .ok_or_else(|| Error::authentication("Provider callback did not include a token"))
    }
}
