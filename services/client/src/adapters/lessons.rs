//! services/client/src/adapters/lessons.rs
//!
//! The HTTP adapter for the `LessonService` port.

use async_trait::async_trait;
use life_lessons_core::domain::{
    Comment, Favorite, Lesson, LessonDraft, LessonFilter, LessonPatch, LikeState, Page,
    ReportDraft, UserStats,
};
use life_lessons_core::ports::{LessonService, PortError, PortResult};
use serde_json::json;

use crate::adapters::records::{
    CommentRecord, FavoriteRecord, LessonRecord, LessonWriteRecord, LikeRecord, ListRecord,
    UserStatsRecord,
};
use crate::adapters::rest::RestClient;

/// Talks to the `/lessons` endpoints through a `RestClient`.
#[derive(Clone, Debug)]
pub struct HttpLessonAdapter {
    client: RestClient,
}

impl HttpLessonAdapter {
    pub fn new(client: RestClient) -> Self {
        Self { client }
    }

    /// Resolves a write answer to the stored lesson, reading it back when the
    /// backend only acknowledged the write.
    async fn resolve_write(
        &self,
        record: LessonWriteRecord,
        lesson_id: Option<&str>,
    ) -> PortResult<Lesson> {
        match record {
            LessonWriteRecord::Lesson(lesson) => Ok(lesson.to_domain()),
            LessonWriteRecord::Inserted { inserted_id } => self.lesson(&inserted_id).await,
            LessonWriteRecord::Ack(ack) => match lesson_id {
                Some(id) => self.lesson(id).await,
                None => Err(PortError::Decode(format!(
                    "write acknowledged without a lesson id: {}",
                    ack
                ))),
            },
        }
    }
}

#[async_trait]
impl LessonService for HttpLessonAdapter {
    async fn public_lessons(&self, filter: &LessonFilter) -> PortResult<Page<Lesson>> {
        let record: ListRecord<LessonRecord> =
            self.client.get("lessons/public", &filter.to_params()).await?;
        Ok(record.into_page(filter.limit, LessonRecord::to_domain))
    }

    async fn featured_lessons(&self) -> PortResult<Vec<Lesson>> {
        let record: ListRecord<LessonRecord> = self.client.get("lessons/featured", &[]).await?;
        Ok(record.into_vec(LessonRecord::to_domain))
    }

    async fn lesson(&self, lesson_id: &str) -> PortResult<Lesson> {
        let record: LessonRecord = self
            .client
            .get(&format!("lessons/{}", lesson_id), &[])
            .await?;
        Ok(record.to_domain())
    }

    async fn comments(&self, lesson_id: &str) -> PortResult<Vec<Comment>> {
        let record: ListRecord<CommentRecord> = self
            .client
            .get(&format!("lessons/{}/comments", lesson_id), &[])
            .await?;
        Ok(record.into_vec(|c| c.to_domain(lesson_id)))
    }

    async fn my_lessons(&self) -> PortResult<Vec<Lesson>> {
        let record: ListRecord<LessonRecord> = self.client.get("lessons/my", &[]).await?;
        Ok(record.into_vec(LessonRecord::to_domain))
    }

    async fn create_lesson(&self, draft: &LessonDraft) -> PortResult<Lesson> {
        let record: LessonWriteRecord = self.client.post("lessons", draft).await?;
        self.resolve_write(record, None).await
    }

    async fn update_lesson(&self, lesson_id: &str, patch: &LessonPatch) -> PortResult<Lesson> {
        let record: LessonWriteRecord = self
            .client
            .patch(&format!("lessons/{}", lesson_id), patch)
            .await?;
        self.resolve_write(record, Some(lesson_id)).await
    }

    async fn delete_lesson(&self, lesson_id: &str) -> PortResult<()> {
        let _: serde_json::Value = self.client.delete(&format!("lessons/{}", lesson_id)).await?;
        Ok(())
    }

    async fn user_stats(&self) -> PortResult<UserStats> {
        let record: UserStatsRecord = self.client.get("lessons/my/stats", &[]).await?;
        Ok(record.to_domain())
    }

    async fn toggle_like(&self, lesson_id: &str) -> PortResult<LikeState> {
        let record: LikeRecord = self
            .client
            .patch_empty(&format!("lessons/{}/like", lesson_id))
            .await?;
        Ok(record.to_domain())
    }

    async fn add_favorite(&self, lesson_id: &str) -> PortResult<()> {
        let _: serde_json::Value = self
            .client
            .post_empty(&format!("lessons/favorites/{}", lesson_id))
            .await?;
        Ok(())
    }

    async fn remove_favorite(&self, lesson_id: &str) -> PortResult<()> {
        let _: serde_json::Value = self
            .client
            .delete(&format!("lessons/favorites/{}", lesson_id))
            .await?;
        Ok(())
    }

    async fn favorites(&self) -> PortResult<Vec<Favorite>> {
        let record: ListRecord<FavoriteRecord> = self.client.get("lessons/favorites", &[]).await?;
        Ok(record.into_vec(FavoriteRecord::to_domain))
    }

    async fn report_lesson(&self, lesson_id: &str, report: &ReportDraft) -> PortResult<()> {
        let _: serde_json::Value = self
            .client
            .post(&format!("lessons/{}/report", lesson_id), report)
            .await?;
        Ok(())
    }

    async fn add_comment(&self, lesson_id: &str, text: &str) -> PortResult<Comment> {
        let record: CommentRecord = self
            .client
            .post(
                &format!("lessons/{}/comments", lesson_id),
                &json!({ "text": text.trim() }),
            )
            .await?;
        Ok(record.to_domain(lesson_id))
    }
}
