//! services/ingest/src/adapters/course_store.rs
//!
//! This module contains the adapter for the backend's course endpoints. It
//! implements the `CourseStore` port from the `core` crate.

use async_trait::async_trait;
use content_ingest_core::{
    domain::CourseDraft,
    ports::{CourseStore, PortResult},
};
use reqwest::Method;
use tracing::info;

use super::http_backend::BackendClient;

/// An adapter that implements the `CourseStore` port over HTTP.
#[derive(Clone, Debug)]
pub struct HttpCourseStore {
    client: BackendClient,
}

impl HttpCourseStore {
    pub fn new(client: BackendClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CourseStore for HttpCourseStore {
    async fn fetch_course(&self, course_id: &str) -> PortResult<CourseDraft> {
        let builder = self
            .client
            .request(Method::GET, &format!("/courses/{}", course_id));
        self.client.send_json(builder).await
    }

    async fn create_course(&self, course: &CourseDraft) -> PortResult<CourseDraft> {
        let builder = self.client.request(Method::POST, "/courses").json(course);
        let created: CourseDraft = self.client.send_json(builder).await?;
        info!(course_id = ?created.id, title = %created.title, "Course created.");
        Ok(created)
    }

    async fn update_course(
        &self,
        course_id: &str,
        course: &CourseDraft,
    ) -> PortResult<CourseDraft> {
        let builder = self
            .client
            .request(Method::PUT, &format!("/courses/{}", course_id))
            .json(course);
        let updated: CourseDraft = self.client.send_json(builder).await?;
        info!(course_id, folders = updated.folders.folder_count(), "Course updated.");
        Ok(updated)
    }
}
