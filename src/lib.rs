// depbot-prs library.
// Aggregates open dependency-bot pull requests across GitHub repositories.

pub mod cache;
pub mod config;
pub mod error;
pub mod github;
pub mod logging;
pub mod prs;
pub mod scheduler;
pub mod server;

pub use error::{AppError, Result};
