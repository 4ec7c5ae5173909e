//! Evidence capture and verification client for property listings.
//!
//! - `capture`: GPS and camera evidence taken at submission time
//! - `api`: submission, review status/visibility, the verification queue
//!   and the admin activity feed

pub mod api;
pub mod capture;
pub mod config;
pub mod error;
pub mod models;

pub use api::ApiClient;
pub use config::ClientConfig;
pub use error::{ClientError, DeviceError, ValidationError};
