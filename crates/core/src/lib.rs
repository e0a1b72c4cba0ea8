//! Talent Connect core types and utilities

pub mod config;
pub mod error;
pub mod logging;
pub mod validation;

pub use config::{ApiConfig, RouteConfig, SessionConfig};
pub use error::{CoreError, CoreResult};
pub use validation::{ValidateConfig, validators};
