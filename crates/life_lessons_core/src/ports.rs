//! crates/life_lessons_core/src/ports.rs
//!
//! Defines the service contracts (traits) the client depends on.
//! These traits form the boundary of the hexagonal architecture: the query
//! cache, mutation runner and views only ever see these ports, while the
//! concrete HTTP adapters live in the `client` service.

use async_trait::async_trait;

use crate::domain::{
    AdminStats, CheckoutSession, Comment, Favorite, Lesson, LessonDraft, LessonFilter,
    LessonPatch, LikeState, Page, PaymentVerification, ProfileUpdate, ReportDraft,
    ReportedLesson, Role, User, UserStats,
};
use crate::validation::ValidationErrors;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the transport details of the remote backend.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PortError {
    /// The request never produced an HTTP response.
    #[error("Network error: {0}")]
    Transport(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Forbidden")]
    Forbidden,
    #[error("Item not found: {0}")]
    NotFound(String),
    /// Any other 4xx. The message is the backend's, shown to the user as-is.
    #[error("{message}")]
    Client { status: u16, message: String },
    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },
    /// Rejected before reaching the network.
    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),
    #[error("Could not decode response: {0}")]
    Decode(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

impl PortError {
    /// Whether a failed read may be retried automatically.
    pub fn is_transient(&self) -> bool {
        matches!(self, PortError::Transport(_) | PortError::Server { .. })
    }

    /// Maps an HTTP status and body message onto the taxonomy.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            401 => PortError::Unauthorized,
            403 => PortError::Forbidden,
            404 => PortError::NotFound(message),
            400..=499 => PortError::Client { status, message },
            _ => PortError::Server { status, message },
        }
    }
}

impl From<ValidationErrors> for PortError {
    fn from(errors: ValidationErrors) -> Self {
        PortError::Validation(errors)
    }
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait LessonService: Send + Sync {
    // --- Public reads ---
    async fn public_lessons(&self, filter: &LessonFilter) -> PortResult<Page<Lesson>>;

    async fn featured_lessons(&self) -> PortResult<Vec<Lesson>>;

    async fn lesson(&self, lesson_id: &str) -> PortResult<Lesson>;

    async fn comments(&self, lesson_id: &str) -> PortResult<Vec<Comment>>;

    // --- Authoring ---
    async fn my_lessons(&self) -> PortResult<Vec<Lesson>>;

    async fn create_lesson(&self, draft: &LessonDraft) -> PortResult<Lesson>;

    async fn update_lesson(&self, lesson_id: &str, patch: &LessonPatch) -> PortResult<Lesson>;

    async fn delete_lesson(&self, lesson_id: &str) -> PortResult<()>;

    async fn user_stats(&self) -> PortResult<UserStats>;

    // --- Engagement ---
    async fn toggle_like(&self, lesson_id: &str) -> PortResult<LikeState>;

    async fn add_favorite(&self, lesson_id: &str) -> PortResult<()>;

    async fn remove_favorite(&self, lesson_id: &str) -> PortResult<()>;

    async fn favorites(&self) -> PortResult<Vec<Favorite>>;

    async fn report_lesson(&self, lesson_id: &str, report: &ReportDraft) -> PortResult<()>;

    async fn add_comment(&self, lesson_id: &str, text: &str) -> PortResult<Comment>;
}

#[async_trait]
pub trait UserService: Send + Sync {
    /// `GET /users/me`
    async fn current_user(&self) -> PortResult<User>;

    /// `POST /users/sync`, called once after the identity provider signs a user in.
    async fn sync_user(&self) -> PortResult<User>;

    async fn update_profile(&self, update: &ProfileUpdate) -> PortResult<User>;
}

#[async_trait]
pub trait AdminService: Send + Sync {
    async fn stats(&self) -> PortResult<AdminStats>;

    async fn users(&self) -> PortResult<Vec<User>>;

    async fn set_user_role(&self, user_id: &str, role: Role) -> PortResult<()>;

    async fn delete_user(&self, user_id: &str) -> PortResult<()>;

    async fn lessons(&self) -> PortResult<Vec<Lesson>>;

    async fn set_featured(&self, lesson_id: &str, featured: bool) -> PortResult<()>;

    async fn delete_lesson(&self, lesson_id: &str) -> PortResult<()>;

    async fn reported_lessons(&self) -> PortResult<Vec<ReportedLesson>>;

    async fn reported_lesson(&self, lesson_id: &str) -> PortResult<ReportedLesson>;

    /// Clears every report against a lesson while keeping the lesson.
    async fn dismiss_reports(&self, lesson_id: &str) -> PortResult<()>;
}

#[async_trait]
pub trait PaymentService: Send + Sync {
    async fn create_checkout_session(&self) -> PortResult<CheckoutSession>;

    async fn verify_session(&self, session_id: &str) -> PortResult<PaymentVerification>;
}
