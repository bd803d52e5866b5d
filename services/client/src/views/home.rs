//! services/client/src/views/home.rs
//!
//! The landing page: featured lessons and the top contributors board.

use std::sync::Arc;

use life_lessons_core::access::LessonCard;
use life_lessons_core::domain::LessonFilter;
use life_lessons_core::leaderboard::{top_contributors, Contributor, DEFAULT_TOP_CONTRIBUTORS};
use life_lessons_core::ports::PortResult;

use super::state::AppContext;
use super::with_service;
use crate::cache::{keys, QueryObserver};

pub struct HomeView {
    ctx: Arc<AppContext>,
    _observers: [QueryObserver; 2],
}

impl HomeView {
    pub fn new(ctx: Arc<AppContext>) -> Self {
        let observers = [
            ctx.cache.observe(keys::featured_lessons()),
            ctx.cache.observe(keys::public_lessons(&Self::leaderboard_filter(&ctx))),
        ];
        Self {
            ctx,
            _observers: observers,
        }
    }

    /// The leaderboard is computed over one large page of public lessons
    /// (newest first), so authors outside that window are under-counted.
    fn leaderboard_filter(ctx: &AppContext) -> LessonFilter {
        LessonFilter {
            limit: ctx.config.leaderboard_fetch_limit,
            ..LessonFilter::default()
        }
    }

    pub async fn featured(&self) -> PortResult<Vec<LessonCard>> {
        let lessons = Arc::clone(&self.ctx.public().lessons);
        let featured = self
            .ctx
            .cache
            .fetch(
                keys::featured_lessons(),
                with_service(lessons, |lessons| async move { lessons.featured_lessons().await }),
            )
            .await?;
        let viewer = self.ctx.viewer();
        Ok(featured
            .iter()
            .filter_map(|lesson| LessonCard::project(&viewer, lesson))
            .collect())
    }

    pub async fn top_contributors(&self) -> PortResult<Vec<Contributor>> {
        let filter = Self::leaderboard_filter(&self.ctx);
        let key = keys::public_lessons(&filter);
        let lessons = Arc::clone(&self.ctx.public().lessons);
        let page = self
            .ctx
            .cache
            .fetch(
                key,
                with_service(lessons, move |lessons| {
                    let filter = filter.clone();
                    async move { lessons.public_lessons(&filter).await }
                }),
            )
            .await?;
        Ok(top_contributors(&page.items, DEFAULT_TOP_CONTRIBUTORS))
    }
}
