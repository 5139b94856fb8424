//! # server
//!
//! HTTP front end for the QR stamping pipeline: upload a PDF, get back a
//! link to the stamped copy.

mod api;
mod config;
mod error;
mod upload;

pub use api::{app, health_check, index, upload_pdf, AppState, UploadResponse, ENDPOINT_QR_SIZE};
pub use config::{AppConfig, Args};
pub use error::{AppError, ErrorResponse};
