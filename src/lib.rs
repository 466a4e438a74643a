//! Elidune Portal
//!
//! Client-side core of the Elidune library portal: the borrow/waitlist
//! request lifecycle of a patron and the admin health dashboard loop,
//! reconciled against the library REST API.

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult, ErrorKind};
pub use services::Services;
