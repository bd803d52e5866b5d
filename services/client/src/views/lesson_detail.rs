//! services/client/src/views/lesson_detail.rs
//!
//! A single lesson with its comments, and the reader's actions on it:
//! like, save, report and comment.

use std::sync::{Arc, Mutex, PoisonError};

use life_lessons_core::access::{LessonCard, RouteRequirement};
use life_lessons_core::domain::{Comment, Lesson, LikeState, ReportDraft};
use life_lessons_core::ports::{PortError, PortResult};
use life_lessons_core::validation::{validate_comment, validate_report};

use super::state::AppContext;
use super::with_service;
use crate::cache::{keys, Mutation, QueryObserver};

/// Everything the detail page renders.
#[derive(Debug, Clone, PartialEq)]
pub struct LessonDetail {
    pub card: LessonCard,
    pub liked: bool,
    pub saved: bool,
    pub comments: Vec<Comment>,
}

/// The most recent save/unsave the reader asked for, held only while
/// toggles are still running.
#[derive(Debug, Default)]
struct SavedIntent {
    desired: Option<bool>,
    pending: usize,
}

/// Releases one queued toggle, even when the caller stops waiting.
struct PendingToggle<'a> {
    intent: &'a Mutex<SavedIntent>,
    failed: bool,
}

impl Drop for PendingToggle<'_> {
    fn drop(&mut self) {
        let mut intent = self.intent.lock().unwrap_or_else(PoisonError::into_inner);
        intent.pending = intent.pending.saturating_sub(1);
        if self.failed || intent.pending == 0 {
            intent.desired = None;
        }
    }
}

pub struct LessonDetailView {
    ctx: Arc<AppContext>,
    lesson_id: String,
    saved_intent: Mutex<SavedIntent>,
    like: Mutation<(), LikeState>,
    favorite: Mutation<bool, ()>,
    report: Mutation<ReportDraft, ()>,
    comment: Mutation<String, Comment>,
    _observers: [QueryObserver; 2],
}

impl LessonDetailView {
    pub fn new(ctx: Arc<AppContext>, lesson_id: &str) -> Self {
        let id = lesson_id.to_string();
        let cache = ctx.cache.clone();

        let like = {
            let ctx = Arc::clone(&ctx);
            let run_id = id.clone();
            let dep_id = id.clone();
            Mutation::new("toggle-like", cache.clone(), move |()| {
                let ctx = Arc::clone(&ctx);
                let id = run_id.clone();
                async move {
                    let services = ctx.session.services()?;
                    services.lessons.toggle_like(&id).await
                }
            })
            .invalidates(move |_| {
                vec![
                    keys::lesson(&dep_id),
                    keys::public_lessons_all(),
                    keys::featured_lessons(),
                ]
            })
        };

        let favorite = {
            let ctx = Arc::clone(&ctx);
            let run_id = id.clone();
            let dep_id = id.clone();
            Mutation::new("toggle-favorite", cache.clone(), move |saved: bool| {
                let ctx = Arc::clone(&ctx);
                let id = run_id.clone();
                async move {
                    let services = ctx.session.services()?;
                    if saved {
                        services.lessons.add_favorite(&id).await
                    } else {
                        services.lessons.remove_favorite(&id).await
                    }
                }
            })
            .invalidates(move |_| {
                vec![keys::lesson(&dep_id), keys::favorites(), keys::user_stats()]
            })
        };

        let report = {
            let ctx = Arc::clone(&ctx);
            let run_id = id.clone();
            Mutation::new("report-lesson", cache.clone(), move |draft: ReportDraft| {
                let ctx = Arc::clone(&ctx);
                let id = run_id.clone();
                async move {
                    let services = ctx.session.services()?;
                    services.lessons.report_lesson(&id, &draft).await
                }
            })
            .validate_with(validate_report)
            .invalidates(|_| vec![keys::reported_lessons(), keys::admin_stats()])
        };

        let comment = {
            let ctx = Arc::clone(&ctx);
            let run_id = id.clone();
            let dep_id = id.clone();
            Mutation::new("add-comment", cache.clone(), move |text: String| {
                let ctx = Arc::clone(&ctx);
                let id = run_id.clone();
                async move {
                    let services = ctx.session.services()?;
                    services.lessons.add_comment(&id, &text).await
                }
            })
            .validate_with(|text: &String| validate_comment(text))
            .invalidates(move |_| vec![keys::comments(&dep_id)])
        };

        let observers = [cache.observe(keys::lesson(&id)), cache.observe(keys::comments(&id))];
        Self {
            ctx,
            lesson_id: id,
            saved_intent: Mutex::new(SavedIntent::default()),
            like,
            favorite,
            report,
            comment,
            _observers: observers,
        }
    }

    pub fn lesson_id(&self) -> &str {
        &self.lesson_id
    }

    async fn fetch_lesson(&self) -> PortResult<Arc<Lesson>> {
        let lessons = Arc::clone(&self.ctx.services().lessons);
        let id = self.lesson_id.clone();
        self.ctx
            .cache
            .fetch(
                keys::lesson(&id),
                with_service(lessons, move |lessons| {
                    let id = id.clone();
                    async move { lessons.lesson(&id).await }
                }),
            )
            .await
    }

    async fn fetch_comments(&self) -> PortResult<Arc<Vec<Comment>>> {
        let lessons = Arc::clone(&self.ctx.services().lessons);
        let id = self.lesson_id.clone();
        self.ctx
            .cache
            .fetch(
                keys::comments(&id),
                with_service(lessons, move |lessons| {
                    let id = id.clone();
                    async move { lessons.comments(&id).await }
                }),
            )
            .await
    }

    /// Loads the lesson for the signed-in reader. Private lessons of other
    /// authors read as not found; premium lessons come back blurred.
    pub async fn load(&self) -> PortResult<LessonDetail> {
        let viewer = self.ctx.guard(RouteRequirement::Authenticated)?;
        let (lesson, comments) = futures::try_join!(self.fetch_lesson(), self.fetch_comments())?;
        let card = LessonCard::project(&viewer, &lesson)
            .ok_or_else(|| PortError::NotFound("Lesson not found".to_string()))?;
        Ok(LessonDetail {
            card,
            liked: lesson.liked_by_viewer,
            saved: self.saved(&lesson),
            comments: comments.to_vec(),
        })
    }

    fn saved(&self, lesson: &Lesson) -> bool {
        self.saved_intent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .desired
            .unwrap_or(lesson.saved_by_viewer)
    }

    pub async fn toggle_like(&self) -> PortResult<LikeState> {
        self.ctx.guard(RouteRequirement::Authenticated)?;
        self.like.mutate(()).await
    }

    /// Flips the saved state. Rapid toggles are queued in order and each one
    /// sends the state the reader asked for, so the last click wins. Once the
    /// queue drains, or a toggle fails, the page follows the server again.
    pub async fn toggle_favorite(&self) -> PortResult<bool> {
        self.ctx.guard(RouteRequirement::Authenticated)?;
        let desired = {
            let current = self.ctx.cache.peek::<Lesson>(&keys::lesson(&self.lesson_id));
            let mut intent = self
                .saved_intent
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            let saved = intent.desired.unwrap_or_else(|| {
                current.data.map_or(false, |lesson| lesson.saved_by_viewer)
            });
            intent.desired = Some(!saved);
            intent.pending += 1;
            !saved
        };
        let mut toggle = PendingToggle {
            intent: &self.saved_intent,
            failed: false,
        };
        let result = self.favorite.mutate(desired).await;
        toggle.failed = result.is_err();
        result.map(|()| desired)
    }

    pub async fn report(&self, draft: ReportDraft) -> PortResult<()> {
        self.ctx.guard(RouteRequirement::Authenticated)?;
        self.report.mutate(draft).await
    }

    pub async fn add_comment(&self, text: &str) -> PortResult<Comment> {
        self.ctx.guard(RouteRequirement::Authenticated)?;
        self.comment.mutate(text.to_string()).await
    }

    pub fn is_saving(&self) -> bool {
        self.favorite.is_pending()
    }
}
