pub mod adapters;
pub mod authoring;
pub mod config;
pub mod error;
pub mod telemetry;

pub use authoring::CourseEditor;
pub use config::{Config, ConfigError};
pub use error::{ServiceError, ServiceResult};
