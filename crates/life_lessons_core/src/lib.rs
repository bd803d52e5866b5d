pub mod access;
pub mod domain;
pub mod leaderboard;
pub mod ports;
pub mod validation;

pub use access::{resolve_access, resolve_content, AccessDecision, LessonCard, Redirect, RouteRequirement, Viewer};
pub use domain::{
    AccessLevel, AdminStats, Author, Category, CheckoutSession, Comment, EmotionalTone, Favorite,
    Lesson, LessonDraft, LessonFilter, LessonPatch, LessonSort, LikeState, Page,
    PaymentVerification, ProfileUpdate, Report, ReportDraft, ReportReason, ReportedLesson, Role,
    User, UserStats, Visibility,
};
pub use leaderboard::{top_contributors, Contributor};
pub use ports::{
    AdminService, LessonService, PaymentService, PortError, PortResult, UserService,
};
pub use validation::ValidationErrors;
