//! services/client/src/adapters/admin.rs
//!
//! The HTTP adapter for the `AdminService` port. Every call needs an admin
//! credential; the backend answers 403 otherwise.

use async_trait::async_trait;
use life_lessons_core::domain::{AdminStats, Lesson, ReportedLesson, Role, User};
use life_lessons_core::ports::{AdminService, PortResult};
use serde_json::json;

use crate::adapters::records::{
    AdminStatsRecord, LessonRecord, ListRecord, ReportedLessonRecord, UserRecord,
};
use crate::adapters::rest::RestClient;

#[derive(Clone, Debug)]
pub struct HttpAdminAdapter {
    client: RestClient,
}

impl HttpAdminAdapter {
    pub fn new(client: RestClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl AdminService for HttpAdminAdapter {
    async fn stats(&self) -> PortResult<AdminStats> {
        let record: AdminStatsRecord = self.client.get("admin/stats", &[]).await?;
        Ok(record.to_domain())
    }

    async fn users(&self) -> PortResult<Vec<User>> {
        let record: ListRecord<UserRecord> = self.client.get("admin/users", &[]).await?;
        Ok(record.into_vec(UserRecord::to_domain))
    }

    async fn set_user_role(&self, user_id: &str, role: Role) -> PortResult<()> {
        let _: serde_json::Value = self
            .client
            .patch(&format!("admin/users/{}/role", user_id), &json!({ "role": role }))
            .await?;
        Ok(())
    }

    async fn delete_user(&self, user_id: &str) -> PortResult<()> {
        let _: serde_json::Value = self.client.delete(&format!("admin/users/{}", user_id)).await?;
        Ok(())
    }

    async fn lessons(&self) -> PortResult<Vec<Lesson>> {
        let record: ListRecord<LessonRecord> = self.client.get("admin/lessons", &[]).await?;
        Ok(record.into_vec(LessonRecord::to_domain))
    }

    async fn set_featured(&self, lesson_id: &str, featured: bool) -> PortResult<()> {
        let _: serde_json::Value = self
            .client
            .patch(
                &format!("admin/lessons/{}/featured", lesson_id),
                &json!({ "isFeatured": featured }),
            )
            .await?;
        Ok(())
    }

    async fn delete_lesson(&self, lesson_id: &str) -> PortResult<()> {
        let _: serde_json::Value = self
            .client
            .delete(&format!("admin/lessons/{}", lesson_id))
            .await?;
        Ok(())
    }

    async fn reported_lessons(&self) -> PortResult<Vec<ReportedLesson>> {
        let record: ListRecord<ReportedLessonRecord> =
            self.client.get("admin/reported-lessons", &[]).await?;
        Ok(record.into_vec(ReportedLessonRecord::to_domain))
    }

    async fn reported_lesson(&self, lesson_id: &str) -> PortResult<ReportedLesson> {
        let record: ReportedLessonRecord = self
            .client
            .get(&format!("admin/reported-lessons/{}", lesson_id), &[])
            .await?;
        Ok(record.to_domain())
    }

    async fn dismiss_reports(&self, lesson_id: &str) -> PortResult<()> {
        let _: serde_json::Value = self
            .client
            .delete(&format!("admin/lessons/{}/reports", lesson_id))
            .await?;
        Ok(())
    }
}
