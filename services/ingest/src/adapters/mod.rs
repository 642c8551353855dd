pub mod course_store;
pub mod http_backend;
pub mod protocol;

pub use course_store::HttpCourseStore;
pub use http_backend::{BackendClient, HttpUploadBackend};
