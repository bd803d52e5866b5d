//! services/client/src/views/public_lessons.rs
//!
//! The public lessons browser: search, filters, sort and pagination.

use std::sync::Arc;

use life_lessons_core::access::LessonCard;
use life_lessons_core::domain::{Category, EmotionalTone, LessonFilter, LessonSort};
use life_lessons_core::ports::PortResult;

use super::state::AppContext;
use super::with_service;
use crate::cache::{keys, QueryKey, QueryObserver};

/// One rendered page of the listing.
#[derive(Debug, Clone, PartialEq)]
pub struct LessonListing {
    pub cards: Vec<LessonCard>,
    pub total: u64,
    pub page: u32,
    pub total_pages: u32,
}

impl LessonListing {
    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }
}

pub struct PublicLessonsView {
    ctx: Arc<AppContext>,
    filter: LessonFilter,
    observer: QueryObserver,
}

impl PublicLessonsView {
    pub fn new(ctx: Arc<AppContext>) -> Self {
        let filter = LessonFilter::default();
        let observer = ctx.cache.observe(keys::public_lessons(&filter));
        Self {
            ctx,
            filter,
            observer,
        }
    }

    pub fn filter(&self) -> &LessonFilter {
        &self.filter
    }

    pub fn key(&self) -> QueryKey {
        keys::public_lessons(&self.filter)
    }

    pub fn set_search(&mut self, text: &str) {
        let search = Some(text.trim().to_string()).filter(|s| !s.is_empty());
        self.update(|f| f.search = search);
    }

    pub fn set_category(&mut self, category: Option<Category>) {
        self.update(|f| f.category = category);
    }

    pub fn set_tone(&mut self, tone: Option<EmotionalTone>) {
        self.update(|f| f.tone = tone);
    }

    pub fn set_sort(&mut self, sort: LessonSort) {
        self.update(|f| f.sort = sort);
    }

    /// Moves to another page of the same result set.
    pub fn set_page(&mut self, page: u32) {
        let page = page.max(1);
        if page != self.filter.page {
            self.filter.page = page;
            self.remount();
        }
    }

    /// Applies a filter change. Any change sends the listing back to page 1.
    fn update(&mut self, change: impl FnOnce(&mut LessonFilter)) {
        let before = self.filter.clone();
        change(&mut self.filter);
        self.filter.page = 1;
        if self.filter != before {
            self.remount();
        }
    }

    fn remount(&mut self) {
        self.observer = self.ctx.cache.observe(self.key());
    }

    /// Waits for the mounted query to change.
    pub async fn changed(&mut self) -> bool {
        self.observer.changed().await
    }

    /// Reads the current page, with each card gated for the current viewer.
    pub async fn load(&self) -> PortResult<LessonListing> {
        let filter = self.filter.clone();
        let lessons = Arc::clone(&self.ctx.public().lessons);
        let page = self
            .ctx
            .cache
            .fetch(
                self.key(),
                with_service(lessons, move |lessons| {
                    let filter = filter.clone();
                    async move { lessons.public_lessons(&filter).await }
                }),
            )
            .await?;

        let viewer = self.ctx.viewer();
        Ok(LessonListing {
            cards: page
                .items
                .iter()
                .filter_map(|lesson| LessonCard::project(&viewer, lesson))
                .collect(),
            total: page.total,
            page: page.page,
            total_pages: page.total_pages,
        })
    }
}
