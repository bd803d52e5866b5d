//! crates/life_lessons_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! Wire shapes live in the client's adapters; everything here is the
//! normalised form the rest of the app works with.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

//=========================================================================================
// Closed Enumerations
//=========================================================================================

/// The fixed set of lesson categories offered by the authoring form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "Personal Growth")]
    PersonalGrowth,
    #[serde(rename = "Career")]
    Career,
    #[serde(rename = "Relationships")]
    Relationships,
    #[serde(rename = "Mindset")]
    Mindset,
    #[serde(rename = "Mistakes Learned")]
    MistakesLearned,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::PersonalGrowth,
        Category::Career,
        Category::Relationships,
        Category::Mindset,
        Category::MistakesLearned,
    ];

    /// The label the backend stores and filters by.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::PersonalGrowth => "Personal Growth",
            Category::Career => "Career",
            Category::Relationships => "Relationships",
            Category::Mindset => "Mindset",
            Category::MistakesLearned => "Mistakes Learned",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EmotionalTone {
    Motivational,
    Sad,
    Realization,
    Gratitude,
}

impl EmotionalTone {
    pub const ALL: [EmotionalTone; 4] = [
        EmotionalTone::Motivational,
        EmotionalTone::Sad,
        EmotionalTone::Realization,
        EmotionalTone::Gratitude,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EmotionalTone::Motivational => "Motivational",
            EmotionalTone::Sad => "Sad",
            EmotionalTone::Realization => "Realization",
            EmotionalTone::Gratitude => "Gratitude",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessLevel {
    #[default]
    Free,
    Premium,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Public,
    Private,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

/// Reasons offered by the report dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReportReason {
    #[serde(rename = "Inappropriate Content")]
    InappropriateContent,
    #[serde(rename = "Hate Speech or Harassment")]
    HateSpeech,
    #[serde(rename = "Misleading or False Information")]
    MisleadingInformation,
    #[serde(rename = "Spam or Promotional Content")]
    Spam,
    #[serde(rename = "Sensitive or Disturbing Content")]
    SensitiveContent,
    #[serde(rename = "Other")]
    Other,
}

/// Sort orders understood by `GET /lessons/public`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LessonSort {
    #[default]
    Newest,
    Oldest,
    MostSaved,
}

impl LessonSort {
    pub fn as_str(&self) -> &'static str {
        match self {
            LessonSort::Newest => "newest",
            LessonSort::Oldest => "oldest",
            LessonSort::MostSaved => "most-saved",
        }
    }
}

//=========================================================================================
// Entities
//=========================================================================================

/// The single canonical author shape. Every backend representation of a
/// lesson's creator is folded into this at the data-access boundary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Author {
    pub id: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub photo_url: Option<String>,
}

impl Author {
    /// The grouping key used by the leaderboard: trimmed, lowercased email.
    pub fn email_key(&self) -> Option<String> {
        self.email
            .as_deref()
            .map(|e| e.trim().to_lowercase())
            .filter(|e| !e.is_empty())
    }

    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .or(self.email.as_deref())
            .unwrap_or("Anonymous")
    }

    /// True when this author refers to `user`, by id or by email.
    pub fn is(&self, user: &User) -> bool {
        if let Some(id) = &self.id {
            if *id == user.id {
                return true;
            }
        }
        match self.email_key() {
            Some(email) => email == user.email.trim().to_lowercase(),
            None => false,
        }
    }
}

/// A user-authored post, the core shared unit of the platform.
#[derive(Debug, Clone, PartialEq)]
pub struct Lesson {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: Category,
    pub emotional_tone: EmotionalTone,
    pub access_level: AccessLevel,
    pub visibility: Visibility,
    pub image_url: Option<String>,
    pub author: Author,
    pub likes_count: u64,
    pub favorites_count: u64,
    pub views: u64,
    pub created_at: Option<DateTime<Utc>>,
    pub is_featured: bool,
    /// Viewer-relative flags, only filled by the detail endpoint.
    pub liked_by_viewer: bool,
    pub saved_by_viewer: bool,
}

impl Lesson {
    pub fn is_premium(&self) -> bool {
        self.access_level == AccessLevel::Premium
    }

    pub fn is_public(&self) -> bool {
        self.visibility == Visibility::Public
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub photo_url: Option<String>,
    pub role: Role,
    pub is_premium: bool,
    pub total_lessons: u64,
    pub created_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn as_author(&self) -> Author {
        Author {
            id: Some(self.id.clone()),
            name: Some(self.name.clone()),
            email: Some(self.email.clone()),
            photo_url: self.photo_url.clone(),
        }
    }
}

/// A saved lesson. Its existence is what "saved" means.
#[derive(Debug, Clone, PartialEq)]
pub struct Favorite {
    pub id: String,
    pub lesson: Lesson,
    pub saved_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Comment {
    pub id: String,
    pub lesson_id: String,
    pub author: Author,
    pub text: String,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub id: String,
    pub lesson_id: String,
    pub reporter: Author,
    pub reason: ReportReason,
    pub message: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

/// A lesson in the moderation queue with its aggregated reports.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportedLesson {
    pub lesson: Lesson,
    pub report_count: u64,
    pub reports: Vec<Report>,
}

/// Result of a like toggle as reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LikeState {
    pub liked: bool,
    pub likes_count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserStats {
    pub total_lessons: u64,
    pub public_lessons: u64,
    pub premium_lessons: u64,
    pub total_saved: u64,
    pub total_likes: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdminStats {
    pub total_users: u64,
    pub premium_users: u64,
    pub total_lessons: u64,
    pub public_lessons: u64,
    pub reported_lessons: u64,
    pub todays_lessons: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PaymentVerification {
    pub session_id: String,
    pub paid: bool,
    pub user: Option<User>,
}

/// One page of a paginated collection.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub total_pages: u32,
}

impl<T> Page<T> {
    /// Builds a single page holding every item, for endpoints that do not paginate.
    pub fn single(items: Vec<T>) -> Self {
        let total = items.len() as u64;
        Self {
            items,
            total,
            page: 1,
            total_pages: 1,
        }
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }
}

//=========================================================================================
// Inputs
//=========================================================================================

/// The payload of the "add lesson" form.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonDraft {
    pub title: String,
    pub description: String,
    pub category: Category,
    pub emotional_tone: EmotionalTone,
    pub access_level: AccessLevel,
    pub visibility: Visibility,
    #[serde(rename = "image", skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// A partial update; absent fields are left untouched by the backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emotional_tone: Option<EmotionalTone>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_level: Option<AccessLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visibility: Option<Visibility>,
    #[serde(rename = "image", skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportDraft {
    pub reason: ReportReason,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "photoURL", skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
}

pub const DEFAULT_PAGE_SIZE: u32 = 9;

/// Every parameter that changes the result of the public lessons listing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LessonFilter {
    pub search: Option<String>,
    pub category: Option<Category>,
    pub tone: Option<EmotionalTone>,
    pub sort: LessonSort,
    pub page: u32,
    pub limit: u32,
}

impl Default for LessonFilter {
    fn default() -> Self {
        Self {
            search: None,
            category: None,
            tone: None,
            sort: LessonSort::default(),
            page: 1,
            limit: DEFAULT_PAGE_SIZE,
        }
    }
}

impl LessonFilter {
    /// The query parameters for this filter, in a fixed order. Empty search
    /// text is omitted so that "" and no search share a cache slot.
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::with_capacity(6);
        if let Some(search) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            params.push(("search", search.to_string()));
        }
        if let Some(category) = self.category {
            params.push(("category", category.as_str().to_string()));
        }
        if let Some(tone) = self.tone {
            params.push(("emotionalTone", tone.as_str().to_string()));
        }
        params.push(("sort", self.sort.as_str().to_string()));
        params.push(("page", self.page.max(1).to_string()));
        params.push(("limit", self.limit.to_string()));
        params
    }
}
