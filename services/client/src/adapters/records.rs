//! services/client/src/adapters/records.rs
//!
//! "Impure" wire records as the backend sends them, and their conversion into
//! domain values. Every heterogeneous shape (embedded vs. id-only creators,
//! `_id` vs. `id`, bare arrays vs. paginated envelopes) is resolved here, so
//! nothing past the adapters ever branches on shape.

use chrono::{DateTime, Utc};
use life_lessons_core::domain::{
    AccessLevel, AdminStats, Author, Category, CheckoutSession, Comment, EmotionalTone, Favorite,
    Lesson, LikeState, Page, PaymentVerification, Report, ReportReason, ReportedLesson, Role,
    User, UserStats, Visibility,
};
use serde::Deserialize;

//=========================================================================================
// Authors
//=========================================================================================

/// A creator as it may appear on a lesson: either embedded or a bare id.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum CreatorField {
    Embedded(CreatorRecord),
    Id(String),
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreatorRecord {
    #[serde(default, alias = "_id", alias = "uid")]
    id: Option<String>,
    #[serde(default, alias = "displayName")]
    name: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default, rename = "photoURL", alias = "photoUrl", alias = "photo", alias = "image")]
    photo_url: Option<String>,
}

/// Denormalised author fields some endpoints put directly on the parent object.
#[derive(Debug, Default)]
pub(crate) struct FlatAuthor {
    pub id: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub photo_url: Option<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Folds an optional creator field and any flat fields into one `Author`.
/// Embedded values win; flat fields fill whatever the embedded object lacks.
pub(crate) fn normalize_author(creator: Option<CreatorField>, flat: FlatAuthor) -> Author {
    let embedded = match creator {
        Some(CreatorField::Embedded(record)) => record,
        Some(CreatorField::Id(id)) => CreatorRecord {
            id: Some(id),
            ..CreatorRecord::default()
        },
        None => CreatorRecord::default(),
    };
    Author {
        id: non_blank(embedded.id).or_else(|| non_blank(flat.id)),
        name: non_blank(embedded.name).or_else(|| non_blank(flat.name)),
        email: non_blank(embedded.email).or_else(|| non_blank(flat.email)),
        photo_url: non_blank(embedded.photo_url).or_else(|| non_blank(flat.photo_url)),
    }
}

//=========================================================================================
// Lessons
//=========================================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct LessonRecord {
    #[serde(alias = "_id")]
    id: String,
    title: String,
    #[serde(default)]
    description: String,
    category: Category,
    emotional_tone: EmotionalTone,
    #[serde(default)]
    access_level: AccessLevel,
    #[serde(default, alias = "privacy")]
    visibility: Visibility,
    #[serde(default, alias = "image")]
    image_url: Option<String>,

    #[serde(default, alias = "author")]
    creator: Option<CreatorField>,
    #[serde(default, alias = "authorId")]
    creator_id: Option<String>,
    #[serde(default, alias = "authorName")]
    creator_name: Option<String>,
    #[serde(default, alias = "authorEmail")]
    creator_email: Option<String>,
    #[serde(default, alias = "authorPhoto", alias = "creatorPhotoURL")]
    creator_photo: Option<String>,

    #[serde(default)]
    likes_count: Option<u64>,
    #[serde(default)]
    likes: Vec<String>,
    #[serde(default, alias = "savedCount")]
    favorites_count: u64,
    #[serde(default, alias = "viewsCount")]
    views: u64,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    is_featured: bool,
    #[serde(default)]
    is_liked: bool,
    #[serde(default, alias = "isSaved")]
    is_favorited: bool,
}

impl LessonRecord {
    pub(crate) fn to_domain(self) -> Lesson {
        let likes_count = self.likes_count.unwrap_or(self.likes.len() as u64);
        let author = normalize_author(
            self.creator,
            FlatAuthor {
                id: self.creator_id,
                name: self.creator_name,
                email: self.creator_email,
                photo_url: self.creator_photo,
            },
        );
        Lesson {
            id: self.id,
            title: self.title,
            description: self.description,
            category: self.category,
            emotional_tone: self.emotional_tone,
            access_level: self.access_level,
            visibility: self.visibility,
            image_url: non_blank(self.image_url),
            author,
            likes_count,
            favorites_count: self.favorites_count,
            views: self.views,
            created_at: self.created_at,
            is_featured: self.is_featured,
            liked_by_viewer: self.is_liked,
            saved_by_viewer: self.is_favorited,
        }
    }
}

/// Writes that answer either with the stored lesson or with a bare
/// acknowledgement such as `{ "insertedId": ... }` or `{ "modifiedCount": 1 }`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum LessonWriteRecord {
    Lesson(Box<LessonRecord>),
    Inserted {
        #[serde(rename = "insertedId")]
        inserted_id: String,
    },
    Ack(serde_json::Value),
}

//=========================================================================================
// Lists
//=========================================================================================

/// A list endpoint answer: a bare array, or an envelope with paging fields.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ListRecord<T> {
    Bare(Vec<T>),
    Envelope(EnvelopeRecord<T>),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct EnvelopeRecord<T> {
    #[serde(
        alias = "lessons",
        alias = "users",
        alias = "favorites",
        alias = "comments",
        alias = "data"
    )]
    items: Vec<T>,
    #[serde(default, alias = "totalCount", alias = "totalLessons")]
    total: Option<u64>,
    #[serde(default, alias = "currentPage")]
    page: Option<u32>,
    #[serde(default)]
    total_pages: Option<u32>,
}

impl<T> ListRecord<T> {
    /// Converts into a page, deriving missing paging fields from `page_size`.
    pub(crate) fn into_page<U>(self, page_size: u32, convert: impl Fn(T) -> U) -> Page<U> {
        match self {
            ListRecord::Bare(items) => Page::single(items.into_iter().map(convert).collect()),
            ListRecord::Envelope(envelope) => {
                let items: Vec<U> = envelope.items.into_iter().map(convert).collect();
                let total = envelope.total.unwrap_or(items.len() as u64);
                let total_pages = envelope.total_pages.unwrap_or_else(|| {
                    let size = u64::from(page_size.max(1));
                    total.div_ceil(size).max(1) as u32
                });
                Page {
                    items,
                    total,
                    page: envelope.page.unwrap_or(1),
                    total_pages,
                }
            }
        }
    }

    pub(crate) fn into_vec<U>(self, convert: impl Fn(T) -> U) -> Vec<U> {
        match self {
            ListRecord::Bare(items) => items.into_iter().map(convert).collect(),
            ListRecord::Envelope(envelope) => envelope.items.into_iter().map(convert).collect(),
        }
    }
}

//=========================================================================================
// Users
//=========================================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UserRecord {
    #[serde(alias = "_id")]
    id: String,
    #[serde(default, alias = "displayName")]
    name: Option<String>,
    email: String,
    #[serde(default, rename = "photoURL", alias = "photoUrl", alias = "photo")]
    photo_url: Option<String>,
    #[serde(default)]
    role: Role,
    #[serde(default)]
    is_premium: bool,
    #[serde(default, alias = "lessonsCount")]
    total_lessons: u64,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
}

impl UserRecord {
    pub(crate) fn to_domain(self) -> User {
        let name = non_blank(self.name).unwrap_or_else(|| {
            self.email
                .split('@')
                .next()
                .unwrap_or(self.email.as_str())
                .to_string()
        });
        User {
            id: self.id,
            name,
            email: self.email,
            photo_url: non_blank(self.photo_url),
            role: self.role,
            is_premium: self.is_premium,
            total_lessons: self.total_lessons,
            created_at: self.created_at,
        }
    }
}

/// `GET /users/me` and `POST /users/sync` answer either with the user or `{ "user": ... }`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum UserEnvelopeRecord {
    Wrapped { user: UserRecord },
    Bare(UserRecord),
}

impl UserEnvelopeRecord {
    pub(crate) fn to_domain(self) -> User {
        match self {
            UserEnvelopeRecord::Wrapped { user } => user.to_domain(),
            UserEnvelopeRecord::Bare(user) => user.to_domain(),
        }
    }
}

//=========================================================================================
// Favorites, Comments, Reports
//=========================================================================================

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum FavoriteRecord {
    Wrapped {
        #[serde(alias = "_id")]
        id: String,
        lesson: Box<LessonRecord>,
        #[serde(default, rename = "createdAt", alias = "savedAt")]
        created_at: Option<DateTime<Utc>>,
    },
    Bare(Box<LessonRecord>),
}

impl FavoriteRecord {
    pub(crate) fn to_domain(self) -> Favorite {
        match self {
            FavoriteRecord::Wrapped {
                id,
                lesson,
                created_at,
            } => Favorite {
                id,
                lesson: lesson.to_domain(),
                saved_at: created_at,
            },
            FavoriteRecord::Bare(lesson) => {
                let lesson = lesson.to_domain();
                Favorite {
                    id: lesson.id.clone(),
                    lesson,
                    saved_at: None,
                }
            }
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CommentRecord {
    #[serde(alias = "_id")]
    id: String,
    #[serde(default)]
    lesson_id: Option<String>,
    #[serde(default, alias = "author")]
    user: Option<CreatorField>,
    #[serde(default, alias = "authorName")]
    user_name: Option<String>,
    #[serde(default, alias = "authorEmail")]
    user_email: Option<String>,
    #[serde(default, alias = "authorPhoto", alias = "userPhotoURL")]
    user_photo: Option<String>,
    #[serde(alias = "comment", alias = "content")]
    text: String,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
}

impl CommentRecord {
    pub(crate) fn to_domain(self, lesson_id: &str) -> Comment {
        Comment {
            id: self.id,
            lesson_id: self.lesson_id.unwrap_or_else(|| lesson_id.to_string()),
            author: normalize_author(
                self.user,
                FlatAuthor {
                    id: None,
                    name: self.user_name,
                    email: self.user_email,
                    photo_url: self.user_photo,
                },
            ),
            text: self.text,
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ReportRecord {
    #[serde(alias = "_id")]
    id: String,
    #[serde(default)]
    lesson_id: Option<String>,
    #[serde(default, alias = "reportedBy")]
    reporter: Option<CreatorField>,
    #[serde(default, alias = "reportedByName")]
    reporter_name: Option<String>,
    #[serde(default, alias = "reportedByEmail")]
    reporter_email: Option<String>,
    reason: ReportReason,
    #[serde(default, alias = "details")]
    message: Option<String>,
    #[serde(default, alias = "timestamp")]
    created_at: Option<DateTime<Utc>>,
}

impl ReportRecord {
    pub(crate) fn to_domain(self, lesson_id: &str) -> Report {
        Report {
            id: self.id,
            lesson_id: self.lesson_id.unwrap_or_else(|| lesson_id.to_string()),
            reporter: normalize_author(
                self.reporter,
                FlatAuthor {
                    id: None,
                    name: self.reporter_name,
                    email: self.reporter_email,
                    photo_url: None,
                },
            ),
            reason: self.reason,
            message: non_blank(self.message),
            created_at: self.created_at,
        }
    }
}

/// A moderation queue entry: either `{ lesson, reportCount, reports }` or a
/// lesson with `reportCount`/`reports` merged into it.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ReportedLessonRecord {
    Nested {
        lesson: Box<LessonRecord>,
        #[serde(default, rename = "reportCount", alias = "reportsCount")]
        report_count: Option<u64>,
        #[serde(default)]
        reports: Vec<ReportRecord>,
    },
    Flat {
        #[serde(flatten)]
        lesson: Box<LessonRecord>,
        #[serde(default, rename = "reportCount", alias = "reportsCount")]
        report_count: Option<u64>,
        #[serde(default)]
        reports: Vec<ReportRecord>,
    },
}

impl ReportedLessonRecord {
    pub(crate) fn to_domain(self) -> ReportedLesson {
        let (lesson, report_count, reports) = match self {
            ReportedLessonRecord::Nested {
                lesson,
                report_count,
                reports,
            }
            | ReportedLessonRecord::Flat {
                lesson,
                report_count,
                reports,
            } => (lesson.to_domain(), report_count, reports),
        };
        let reports: Vec<Report> = reports
            .into_iter()
            .map(|r| r.to_domain(&lesson.id))
            .collect();
        ReportedLesson {
            report_count: report_count.unwrap_or(reports.len() as u64),
            lesson,
            reports,
        }
    }
}

//=========================================================================================
// Small Responses
//=========================================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct LikeRecord {
    #[serde(default, alias = "isLiked")]
    liked: bool,
    #[serde(default)]
    likes_count: Option<u64>,
    #[serde(default)]
    likes: Vec<String>,
}

impl LikeRecord {
    pub(crate) fn to_domain(self) -> LikeState {
        LikeState {
            liked: self.liked,
            likes_count: self.likes_count.unwrap_or(self.likes.len() as u64),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct UserStatsRecord {
    #[serde(alias = "totalLessonsCreated")]
    total_lessons: u64,
    public_lessons: u64,
    premium_lessons: u64,
    #[serde(alias = "totalFavorites", alias = "totalSavedLessons")]
    total_saved: u64,
    #[serde(alias = "totalLikesReceived")]
    total_likes: u64,
}

impl UserStatsRecord {
    pub(crate) fn to_domain(self) -> UserStats {
        UserStats {
            total_lessons: self.total_lessons,
            public_lessons: self.public_lessons,
            premium_lessons: self.premium_lessons,
            total_saved: self.total_saved,
            total_likes: self.total_likes,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct AdminStatsRecord {
    total_users: u64,
    premium_users: u64,
    total_lessons: u64,
    #[serde(alias = "totalPublicLessons")]
    public_lessons: u64,
    #[serde(alias = "totalReportedLessons", alias = "flaggedLessons")]
    reported_lessons: u64,
    #[serde(alias = "todayLessons", alias = "newLessonsToday")]
    todays_lessons: u64,
}

impl AdminStatsRecord {
    pub(crate) fn to_domain(self) -> AdminStats {
        AdminStats {
            total_users: self.total_users,
            premium_users: self.premium_users,
            total_lessons: self.total_lessons,
            public_lessons: self.public_lessons,
            reported_lessons: self.reported_lessons,
            todays_lessons: self.todays_lessons,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CheckoutRecord {
    #[serde(default, alias = "sessionId")]
    id: Option<String>,
    url: String,
}

impl CheckoutRecord {
    pub(crate) fn to_domain(self) -> CheckoutSession {
        CheckoutSession {
            id: self.id.unwrap_or_default(),
            url: self.url,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct VerifyRecord {
    #[serde(default, alias = "success", alias = "isPremium")]
    paid: bool,
    #[serde(default)]
    user: Option<UserRecord>,
}

impl VerifyRecord {
    pub(crate) fn to_domain(self, session_id: &str) -> PaymentVerification {
        let user = self.user.map(UserRecord::to_domain);
        PaymentVerification {
            session_id: session_id.to_string(),
            paid: self.paid || user.as_ref().is_some_and(|u| u.is_premium),
            user,
        }
    }
}
