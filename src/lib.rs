// Library exports for route feature scoring and user preference profiles

pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod services;

// Re-export commonly used types
pub use error::{AppError, Result};
