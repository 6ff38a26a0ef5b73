pub mod database;
pub mod secure_store;
pub mod tracking_flag;

pub use database::Database;
pub use secure_store::{CredentialStore, DatabaseCredentialStore, KeyringCredentialStore};
pub use tracking_flag::TrackingFlag;
