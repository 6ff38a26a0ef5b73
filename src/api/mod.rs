pub mod auth;
pub mod client;
pub mod location;
pub mod profile;

pub use auth::{AuthClient, ProviderSignIn, SignUpForm, SignUpOutcome};
pub use client::ApiClient;
pub use location::LocationClient;
pub use profile::{ProfileClient, UserProfile};
