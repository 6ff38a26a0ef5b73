pub mod api;
pub mod commands;
pub mod config;
pub mod error;
pub mod permissions;
pub mod platform;
pub mod sampling;
pub mod state;
pub mod storage;
pub mod utils;

pub use error::{Error, Result};
pub use state::AppState;
