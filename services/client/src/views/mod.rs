//! services/client/src/views/mod.rs
//!
//! View models: each page of the app as a struct that owns its query
//! observers while mounted and exposes the reads and writes the page performs.

pub mod admin;
pub mod dashboard;
pub mod home;
pub mod lesson_detail;
pub mod pricing;
pub mod public_lessons;
pub mod state;

pub use admin::AdminView;
pub use dashboard::DashboardView;
pub use home::HomeView;
pub use lesson_detail::{LessonDetail, LessonDetailView};
pub use pricing::PricingView;
pub use public_lessons::{LessonListing, PublicLessonsView};
pub use state::{AppContext, Connector, HttpConnector, Services, Session};

use std::sync::Arc;

/// Turns a one-shot port call into a repeatable cache fetcher bound to `service`.
pub(crate) fn with_service<S, F, Fut>(service: Arc<S>, call: F) -> impl Fn() -> Fut + Send + Sync + 'static
where
    S: ?Sized + Send + Sync + 'static,
    F: Fn(Arc<S>) -> Fut + Send + Sync + 'static,
{
    move || call(Arc::clone(&service))
}
