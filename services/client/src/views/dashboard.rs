//! services/client/src/views/dashboard.rs
//!
//! The signed-in user's dashboard: their lessons, stats and saved lessons,
//! plus lesson authoring and profile editing.

use std::sync::Arc;

use life_lessons_core::access::RouteRequirement;
use life_lessons_core::domain::{
    Favorite, Lesson, LessonDraft, LessonPatch, ProfileUpdate, User, UserStats,
};
use life_lessons_core::ports::PortResult;
use life_lessons_core::validation::{validate_draft_for, validate_patch, validate_profile};

use super::state::AppContext;
use super::with_service;
use crate::cache::{keys, Mutation, QueryObserver};

pub struct DashboardView {
    ctx: Arc<AppContext>,
    create: Mutation<LessonDraft, Lesson>,
    update: Mutation<(String, LessonPatch), Lesson>,
    delete: Mutation<String, ()>,
    unsave: Mutation<String, ()>,
    profile: Mutation<ProfileUpdate, User>,
    _observers: [QueryObserver; 3],
}

impl DashboardView {
    pub fn new(ctx: Arc<AppContext>) -> Self {
        let cache = ctx.cache.clone();

        let create = {
            let run_ctx = Arc::clone(&ctx);
            let check_ctx = Arc::clone(&ctx);
            Mutation::new("create-lesson", cache.clone(), move |draft: LessonDraft| {
                let ctx = Arc::clone(&run_ctx);
                async move {
                    let services = ctx.session.services()?;
                    services.lessons.create_lesson(&draft).await
                }
            })
            .validate_with(move |draft| validate_draft_for(&check_ctx.viewer(), draft))
            .invalidates(|_| {
                vec![
                    keys::my_lessons(),
                    keys::user_stats(),
                    keys::public_lessons_all(),
                ]
            })
        };

        let update = {
            let run_ctx = Arc::clone(&ctx);
            let check_ctx = Arc::clone(&ctx);
            Mutation::new(
                "update-lesson",
                cache.clone(),
                move |(id, patch): (String, LessonPatch)| {
                    let ctx = Arc::clone(&run_ctx);
                    async move {
                        let services = ctx.session.services()?;
                        services.lessons.update_lesson(&id, &patch).await
                    }
                },
            )
            .validate_with(move |(_, patch)| validate_patch(&check_ctx.viewer(), patch))
            .invalidates(|(id, _)| {
                vec![
                    keys::my_lessons(),
                    keys::user_stats(),
                    keys::lesson(id),
                    keys::public_lessons_all(),
                    keys::featured_lessons(),
                    keys::favorites(),
                ]
            })
        };

        let delete = {
            let run_ctx = Arc::clone(&ctx);
            Mutation::new("delete-lesson", cache.clone(), move |id: String| {
                let ctx = Arc::clone(&run_ctx);
                async move {
                    let services = ctx.session.services()?;
                    services.lessons.delete_lesson(&id).await
                }
            })
            .invalidates(|id| {
                vec![
                    keys::my_lessons(),
                    keys::user_stats(),
                    keys::lesson(id),
                    keys::public_lessons_all(),
                    keys::featured_lessons(),
                    keys::favorites(),
                ]
            })
        };

        let unsave = {
            let run_ctx = Arc::clone(&ctx);
            Mutation::new("remove-favorite", cache.clone(), move |id: String| {
                let ctx = Arc::clone(&run_ctx);
                async move {
                    let services = ctx.session.services()?;
                    services.lessons.remove_favorite(&id).await
                }
            })
            .invalidates(|id| vec![keys::favorites(), keys::user_stats(), keys::lesson(id)])
        };

        let profile = {
            let run_ctx = Arc::clone(&ctx);
            Mutation::new("update-profile", cache.clone(), move |update: ProfileUpdate| {
                let ctx = Arc::clone(&run_ctx);
                async move {
                    let services = ctx.session.services()?;
                    let user = services.users.update_profile(&update).await?;
                    ctx.session.update_user(user.clone());
                    Ok(user)
                }
            })
            .validate_with(validate_profile)
            .invalidates(|_| vec![keys::current_user(), keys::my_lessons()])
        };

        let observers = [
            cache.observe(keys::my_lessons()),
            cache.observe(keys::user_stats()),
            cache.observe(keys::favorites()),
        ];
        Self {
            ctx,
            create,
            update,
            delete,
            unsave,
            profile,
            _observers: observers,
        }
    }

    pub async fn my_lessons(&self) -> PortResult<Arc<Vec<Lesson>>> {
        let services = self.ctx.session.services()?;
        self.ctx
            .cache
            .fetch(
                keys::my_lessons(),
                with_service(services.lessons, |lessons| async move { lessons.my_lessons().await }),
            )
            .await
    }

    pub async fn stats(&self) -> PortResult<Arc<UserStats>> {
        let services = self.ctx.session.services()?;
        self.ctx
            .cache
            .fetch(
                keys::user_stats(),
                with_service(services.lessons, |lessons| async move { lessons.user_stats().await }),
            )
            .await
    }

    pub async fn favorites(&self) -> PortResult<Arc<Vec<Favorite>>> {
        let services = self.ctx.session.services()?;
        self.ctx
            .cache
            .fetch(
                keys::favorites(),
                with_service(services.lessons, |lessons| async move { lessons.favorites().await }),
            )
            .await
    }

    pub async fn create_lesson(&self, draft: LessonDraft) -> PortResult<Lesson> {
        self.ctx.guard(RouteRequirement::Authenticated)?;
        self.create.mutate(draft).await
    }

    pub async fn update_lesson(&self, lesson_id: &str, patch: LessonPatch) -> PortResult<Lesson> {
        self.ctx.guard(RouteRequirement::Authenticated)?;
        self.update.mutate((lesson_id.to_string(), patch)).await
    }

    pub async fn delete_lesson(&self, lesson_id: &str) -> PortResult<()> {
        self.ctx.guard(RouteRequirement::Authenticated)?;
        self.delete.mutate(lesson_id.to_string()).await
    }

    pub async fn remove_favorite(&self, lesson_id: &str) -> PortResult<()> {
        self.ctx.guard(RouteRequirement::Authenticated)?;
        self.unsave.mutate(lesson_id.to_string()).await
    }

    pub async fn update_profile(&self, update: ProfileUpdate) -> PortResult<User> {
        self.ctx.guard(RouteRequirement::Authenticated)?;
        self.profile.mutate(update).await
    }

    pub fn is_saving(&self) -> bool {
        self.create.is_pending() || self.update.is_pending() || self.profile.is_pending()
    }
}
