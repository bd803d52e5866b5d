//! services/client/src/views/admin.rs
//!
//! The admin console: platform stats, user management, lesson moderation
//! and the reported-lessons queue. Every read and write requires the admin role.

use std::sync::Arc;

use life_lessons_core::access::{resolve_access, AccessDecision, RouteRequirement};
use life_lessons_core::domain::{AdminStats, Lesson, ReportedLesson, Role, User};
use life_lessons_core::ports::PortResult;
use tracing::info;

use super::state::AppContext;
use super::with_service;
use crate::cache::{keys, Mutation, QueryObserver};

pub struct AdminView {
    ctx: Arc<AppContext>,
    set_role: Mutation<(String, Role), ()>,
    delete_user: Mutation<String, ()>,
    set_featured: Mutation<(String, bool), ()>,
    delete_lesson: Mutation<String, ()>,
    dismiss: Mutation<String, ()>,
    _observers: [QueryObserver; 4],
}

/// Builds an admin-only write. The role is checked before the request is sent.
fn admin_mutation<I, F, Fut>(ctx: &Arc<AppContext>, name: &'static str, run: F) -> Mutation<I, ()>
where
    I: Send + 'static,
    F: Fn(Arc<AppContext>, I) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = PortResult<()>> + Send + 'static,
{
    let run_ctx = Arc::clone(ctx);
    Mutation::new(name, ctx.cache.clone(), move |input: I| {
        let ctx = Arc::clone(&run_ctx);
        let guarded = ctx.guard(RouteRequirement::Admin).map(|_| run(Arc::clone(&ctx), input));
        async move { guarded?.await }
    })
}

impl AdminView {
    pub fn new(ctx: Arc<AppContext>) -> Self {
        let set_role = admin_mutation(&ctx, "set-user-role", |ctx, (id, role): (String, Role)| async move {
            let services = ctx.session.services()?;
            services.admin.set_user_role(&id, role).await
        })
        .invalidates(|_| vec![keys::admin_users(), keys::admin_stats()]);

        let delete_user = admin_mutation(&ctx, "delete-user", |ctx, id: String| async move {
            let services = ctx.session.services()?;
            services.admin.delete_user(&id).await
        })
        .invalidates(|_| vec![keys::admin_users(), keys::admin_stats()]);

        let set_featured = admin_mutation(&ctx, "set-featured", |ctx, (id, featured): (String, bool)| async move {
            let services = ctx.session.services()?;
            services.admin.set_featured(&id, featured).await
        })
        .invalidates(|(id, _)| {
            vec![
                keys::admin_lessons(),
                keys::featured_lessons(),
                keys::public_lessons_all(),
                keys::lesson(id),
            ]
        });

        let delete_lesson = admin_mutation(&ctx, "admin-delete-lesson", |ctx, id: String| async move {
            let services = ctx.session.services()?;
            services.admin.delete_lesson(&id).await
        })
        .invalidates(|_| vec![keys::admin(), keys::lessons()]);

        let dismiss = admin_mutation(&ctx, "dismiss-reports", |ctx, id: String| async move {
            let services = ctx.session.services()?;
            services.admin.dismiss_reports(&id).await
        })
        .invalidates(|_| vec![keys::reported_lessons(), keys::admin_stats()]);

        let cache = &ctx.cache;
        let observers = [
            cache.observe(keys::admin_stats()),
            cache.observe(keys::admin_users()),
            cache.observe(keys::admin_lessons()),
            cache.observe(keys::reported_lessons()),
        ];
        Self {
            ctx,
            set_role,
            delete_user,
            set_featured,
            delete_lesson,
            dismiss,
            _observers: observers,
        }
    }

    pub fn access(&self) -> AccessDecision {
        resolve_access(&self.ctx.viewer(), RouteRequirement::Admin)
    }

    pub async fn stats(&self) -> PortResult<Arc<AdminStats>> {
        self.ctx.guard(RouteRequirement::Admin)?;
        let admin = self.ctx.session.services()?.admin;
        self.ctx
            .cache
            .fetch(
                keys::admin_stats(),
                with_service(admin, |admin| async move { admin.stats().await }),
            )
            .await
    }

    pub async fn users(&self) -> PortResult<Arc<Vec<User>>> {
        self.ctx.guard(RouteRequirement::Admin)?;
        let admin = self.ctx.session.services()?.admin;
        self.ctx
            .cache
            .fetch(
                keys::admin_users(),
                with_service(admin, |admin| async move { admin.users().await }),
            )
            .await
    }

    pub async fn lessons(&self) -> PortResult<Arc<Vec<Lesson>>> {
        self.ctx.guard(RouteRequirement::Admin)?;
        let admin = self.ctx.session.services()?.admin;
        self.ctx
            .cache
            .fetch(
                keys::admin_lessons(),
                with_service(admin, |admin| async move { admin.lessons().await }),
            )
            .await
    }

    pub async fn reported_lessons(&self) -> PortResult<Arc<Vec<ReportedLesson>>> {
        self.ctx.guard(RouteRequirement::Admin)?;
        let admin = self.ctx.session.services()?.admin;
        self.ctx
            .cache
            .fetch(
                keys::reported_lessons(),
                with_service(admin, |admin| async move { admin.reported_lessons().await }),
            )
            .await
    }

    pub async fn reported_lesson(&self, lesson_id: &str) -> PortResult<Arc<ReportedLesson>> {
        self.ctx.guard(RouteRequirement::Admin)?;
        let admin = self.ctx.session.services()?.admin;
        let id = lesson_id.to_string();
        self.ctx
            .cache
            .fetch(
                keys::reported_lesson(lesson_id),
                with_service(admin, move |admin| {
                    let id = id.clone();
                    async move { admin.reported_lesson(&id).await }
                }),
            )
            .await
    }

    pub async fn set_role(&self, user_id: &str, role: Role) -> PortResult<()> {
        self.set_role.mutate((user_id.to_string(), role)).await?;
        info!(user_id, ?role, "user role changed");
        Ok(())
    }

    pub async fn delete_user(&self, user_id: &str) -> PortResult<()> {
        self.delete_user.mutate(user_id.to_string()).await?;
        info!(user_id, "user deleted");
        Ok(())
    }

    pub async fn set_featured(&self, lesson_id: &str, featured: bool) -> PortResult<()> {
        self.set_featured
            .mutate((lesson_id.to_string(), featured))
            .await
    }

    pub async fn delete_lesson(&self, lesson_id: &str) -> PortResult<()> {
        self.delete_lesson.mutate(lesson_id.to_string()).await?;
        info!(lesson_id, "lesson removed by admin");
        Ok(())
    }

    /// Clears a lesson's reports, keeping the lesson.
    pub async fn dismiss_reports(&self, lesson_id: &str) -> PortResult<()> {
        self.dismiss.mutate(lesson_id.to_string()).await
    }
}
