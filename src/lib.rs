pub mod api;
pub mod error;
pub mod models;
pub mod report;
pub mod transform;
pub mod utils;
pub mod workbook;

pub use error::{ApiError, ConfigError, ReportError, WorkbookError};
