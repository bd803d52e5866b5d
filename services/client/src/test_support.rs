//! services/client/src/test_support.rs
//!
//! An in-memory backend implementing every port, for view and session tests.
//! Tokens of the form `token-<name>` identify `<name>@example.com`.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use life_lessons_core::domain::{
    AccessLevel, AdminStats, Author, Category, CheckoutSession, Comment, EmotionalTone, Favorite,
    Lesson, LessonDraft, LessonFilter, LessonPatch, LessonSort, LikeState, Page,
    PaymentVerification, ProfileUpdate, Report, ReportDraft, ReportedLesson, Role, User,
    UserStats, Visibility,
};
use life_lessons_core::ports::{
    AdminService, LessonService, PaymentService, PortError, PortResult, UserService,
};

use crate::config::Config;
use crate::views::state::{AppContext, Connector, Services};

#[derive(Default)]
struct Store {
    users: Vec<User>,
    lessons: Vec<Lesson>,
    likes: HashSet<(String, String)>,
    favorites: Vec<(String, String)>,
    comments: Vec<Comment>,
    reports: Vec<Report>,
    checkouts: HashMap<String, String>,
    next_id: u64,
    calls: HashMap<&'static str, usize>,
    failures: HashMap<&'static str, PortError>,
    delays: HashMap<&'static str, Duration>,
    last_credential: Option<String>,
}

impl Store {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}-{}", prefix, self.next_id)
    }

    fn timestamp(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(1_700_000_000 + self.next_id as i64 * 60, 0)
            .single()
    }

    fn user_by_email(&self, email: &str) -> Option<&User> {
        self.users.iter().find(|u| u.email == email)
    }

    fn lesson_index(&self, lesson_id: &str) -> PortResult<usize> {
        self.lessons
            .iter()
            .position(|l| l.id == lesson_id)
            .ok_or_else(|| PortError::NotFound("Lesson not found".to_string()))
    }

    fn with_viewer_flags(&self, lesson: &Lesson, email: Option<&str>) -> Lesson {
        let mut lesson = lesson.clone();
        if let Some(email) = email {
            lesson.liked_by_viewer = self
                .likes
                .contains(&(lesson.id.clone(), email.to_string()));
            lesson.saved_by_viewer = self
                .favorites
                .iter()
                .any(|(l, e)| *l == lesson.id && e == email);
        }
        lesson
    }
}

/// Shared handle to the in-memory store; clones see the same data.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    store: Arc<Mutex<Store>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn store(&self) -> MutexGuard<'_, Store> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn add_user(&self, name: &str, role: Role, is_premium: bool) -> User {
        let mut store = self.store();
        let user = User {
            id: store.next_id("user"),
            name: name.to_string(),
            email: format!("{}@example.com", name),
            photo_url: None,
            role,
            is_premium,
            total_lessons: 0,
            created_at: store.timestamp(),
        };
        store.users.push(user.clone());
        user
    }

    /// Stores a lesson written by `<author>@example.com` and returns its id.
    pub fn add_lesson(
        &self,
        title: &str,
        author: &str,
        access_level: AccessLevel,
        visibility: Visibility,
    ) -> String {
        let mut store = self.store();
        let id = store.next_id("lesson");
        let email = format!("{}@example.com", author);
        let author = store
            .user_by_email(&email)
            .map(User::as_author)
            .unwrap_or(Author {
                id: None,
                name: Some(author.to_string()),
                email: Some(email),
                photo_url: None,
            });
        let lesson = Lesson {
            id: id.clone(),
            title: title.to_string(),
            description: format!("{} - a lesson worth sharing with everyone.", title),
            category: Category::PersonalGrowth,
            emotional_tone: EmotionalTone::Realization,
            access_level,
            visibility,
            image_url: None,
            author,
            likes_count: 0,
            favorites_count: 0,
            views: 0,
            created_at: store.timestamp(),
            is_featured: false,
            liked_by_viewer: false,
            saved_by_viewer: false,
        };
        store.lessons.push(lesson);
        id
    }

    pub fn feature(&self, lesson_id: &str) {
        let mut store = self.store();
        if let Some(lesson) = store.lessons.iter_mut().find(|l| l.id == lesson_id) {
            lesson.is_featured = true;
        }
    }

    pub fn set_role(&self, email: &str, role: Role) {
        let mut store = self.store();
        if let Some(user) = store.users.iter_mut().find(|u| u.email == email) {
            user.role = role;
        }
    }

    /// Makes the next call of `op` fail with `err`.
    pub fn fail_next(&self, op: &'static str, err: PortError) {
        self.store().failures.insert(op, err);
    }

    /// Delays every call of `op` by `delay` before it touches the store.
    pub fn delay(&self, op: &'static str, delay: Duration) {
        self.store().delays.insert(op, delay);
    }

    pub fn calls(&self, op: &str) -> usize {
        self.store().calls.get(op).copied().unwrap_or(0)
    }

    pub fn last_credential(&self) -> Option<String> {
        self.store().last_credential.clone()
    }

    pub fn is_saved(&self, lesson_id: &str, email: &str) -> bool {
        self.store()
            .favorites
            .iter()
            .any(|(l, e)| l == lesson_id && e == email)
    }

    pub fn lesson(&self, lesson_id: &str) -> Option<Lesson> {
        self.store()
            .lessons
            .iter()
            .find(|l| l.id == lesson_id)
            .cloned()
    }

    pub fn reports(&self) -> usize {
        self.store().reports.len()
    }
}

impl Connector for MemoryBackend {
    fn connect(&self, credential: Option<&str>) -> Services {
        let port = Arc::new(MemoryPort {
            backend: self.clone(),
            email: credential.map(|token| {
                format!("{}@example.com", token.trim_start_matches("token-"))
            }),
            credential: credential.map(str::to_string),
        });
        Services {
            lessons: port.clone(),
            users: port.clone(),
            admin: port.clone(),
            payments: port,
        }
    }
}

pub fn test_config() -> Arc<Config> {
    let config = Config::from_lookup(|name| match name {
        "API_BASE_URL" => Some("http://localhost:5000".to_string()),
        "QUERY_STALE_SECS" => Some("60".to_string()),
        _ => None,
    })
    .expect("test config");
    Arc::new(config)
}

pub fn context(backend: &MemoryBackend) -> Arc<AppContext> {
    AppContext::new(test_config(), Arc::new(backend.clone()))
}

/// The ports as seen through one credential.
struct MemoryPort {
    backend: MemoryBackend,
    credential: Option<String>,
    email: Option<String>,
}

impl MemoryPort {
    async fn enter(&self, op: &'static str) -> PortResult<MutexGuard<'_, Store>> {
        let delay = {
            let mut store = self.backend.store();
            *store.calls.entry(op).or_default() += 1;
            store.last_credential = self.credential.clone();
            store.delays.get(op).copied()
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let mut store = self.backend.store();
        match store.failures.remove(op) {
            Some(err) => Err(err),
            None => Ok(store),
        }
    }

    fn me(&self, store: &Store) -> PortResult<User> {
        let email = self.email.as_deref().ok_or(PortError::Unauthorized)?;
        store
            .user_by_email(email)
            .cloned()
            .ok_or_else(|| PortError::NotFound("User not found".to_string()))
    }

    fn admin(&self, store: &Store) -> PortResult<User> {
        let me = self.me(store)?;
        if me.is_admin() {
            Ok(me)
        } else {
            Err(PortError::Forbidden)
        }
    }
}

#[async_trait]
impl LessonService for MemoryPort {
    async fn public_lessons(&self, filter: &LessonFilter) -> PortResult<Page<Lesson>> {
        let store = self.enter("public_lessons").await?;
        let search = filter.search.as_deref().unwrap_or("").trim().to_lowercase();
        let mut items: Vec<Lesson> = store
            .lessons
            .iter()
            .filter(|l| l.is_public())
            .filter(|l| search.is_empty() || l.title.to_lowercase().contains(&search))
            .filter(|l| filter.category.map_or(true, |c| l.category == c))
            .filter(|l| filter.tone.map_or(true, |t| l.emotional_tone == t))
            .cloned()
            .collect();
        match filter.sort {
            LessonSort::Newest => items.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
            LessonSort::Oldest => items.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
            LessonSort::MostSaved => items.sort_by(|a, b| b.favorites_count.cmp(&a.favorites_count)),
        }
        let limit = filter.limit.max(1) as usize;
        let total = items.len();
        let page = filter.page.max(1);
        let items = items
            .into_iter()
            .skip((page as usize - 1) * limit)
            .take(limit)
            .collect();
        Ok(Page {
            items,
            total: total as u64,
            page,
            total_pages: ((total + limit - 1) / limit).max(1) as u32,
        })
    }

    async fn featured_lessons(&self) -> PortResult<Vec<Lesson>> {
        let store = self.enter("featured_lessons").await?;
        Ok(store
            .lessons
            .iter()
            .filter(|l| l.is_featured && l.is_public())
            .cloned()
            .collect())
    }

    async fn lesson(&self, lesson_id: &str) -> PortResult<Lesson> {
        let store = self.enter("lesson").await?;
        let index = store.lesson_index(lesson_id)?;
        Ok(store.with_viewer_flags(&store.lessons[index], self.email.as_deref()))
    }

    async fn comments(&self, lesson_id: &str) -> PortResult<Vec<Comment>> {
        let store = self.enter("comments").await?;
        Ok(store
            .comments
            .iter()
            .filter(|c| c.lesson_id == lesson_id)
            .cloned()
            .collect())
    }

    async fn my_lessons(&self) -> PortResult<Vec<Lesson>> {
        let store = self.enter("my_lessons").await?;
        let me = self.me(&store)?;
        Ok(store
            .lessons
            .iter()
            .filter(|l| l.author.is(&me))
            .cloned()
            .collect())
    }

    async fn create_lesson(&self, draft: &LessonDraft) -> PortResult<Lesson> {
        let mut store = self.enter("create_lesson").await?;
        let me = self.me(&store)?;
        let lesson = Lesson {
            id: store.next_id("lesson"),
            title: draft.title.clone(),
            description: draft.description.clone(),
            category: draft.category,
            emotional_tone: draft.emotional_tone,
            access_level: draft.access_level,
            visibility: draft.visibility,
            image_url: draft.image_url.clone(),
            author: me.as_author(),
            likes_count: 0,
            favorites_count: 0,
            views: 0,
            created_at: store.timestamp(),
            is_featured: false,
            liked_by_viewer: false,
            saved_by_viewer: false,
        };
        store.lessons.push(lesson.clone());
        if let Some(user) = store.users.iter_mut().find(|u| u.id == me.id) {
            user.total_lessons += 1;
        }
        Ok(lesson)
    }

    async fn update_lesson(&self, lesson_id: &str, patch: &LessonPatch) -> PortResult<Lesson> {
        let mut store = self.enter("update_lesson").await?;
        let me = self.me(&store)?;
        let index = store.lesson_index(lesson_id)?;
        let lesson = &mut store.lessons[index];
        if !lesson.author.is(&me) && !me.is_admin() {
            return Err(PortError::Forbidden);
        }
        if let Some(title) = &patch.title {
            lesson.title = title.clone();
        }
        if let Some(description) = &patch.description {
            lesson.description = description.clone();
        }
        if let Some(category) = patch.category {
            lesson.category = category;
        }
        if let Some(tone) = patch.emotional_tone {
            lesson.emotional_tone = tone;
        }
        if let Some(access_level) = patch.access_level {
            lesson.access_level = access_level;
        }
        if let Some(visibility) = patch.visibility {
            lesson.visibility = visibility;
        }
        Ok(lesson.clone())
    }

    async fn delete_lesson(&self, lesson_id: &str) -> PortResult<()> {
        let mut store = self.enter("delete_lesson").await?;
        let me = self.me(&store)?;
        let index = store.lesson_index(lesson_id)?;
        if !store.lessons[index].author.is(&me) && !me.is_admin() {
            return Err(PortError::Forbidden);
        }
        store.lessons.remove(index);
        store.favorites.retain(|(l, _)| l != lesson_id);
        Ok(())
    }

    async fn user_stats(&self) -> PortResult<UserStats> {
        let store = self.enter("user_stats").await?;
        let me = self.me(&store)?;
        let mine: Vec<&Lesson> = store.lessons.iter().filter(|l| l.author.is(&me)).collect();
        Ok(UserStats {
            total_lessons: mine.len() as u64,
            public_lessons: mine.iter().filter(|l| l.is_public()).count() as u64,
            premium_lessons: mine.iter().filter(|l| l.is_premium()).count() as u64,
            total_saved: store.favorites.iter().filter(|(_, e)| *e == me.email).count() as u64,
            total_likes: mine.iter().map(|l| l.likes_count).sum(),
        })
    }

    async fn toggle_like(&self, lesson_id: &str) -> PortResult<LikeState> {
        let mut store = self.enter("toggle_like").await?;
        let me = self.me(&store)?;
        let index = store.lesson_index(lesson_id)?;
        let key = (lesson_id.to_string(), me.email);
        let liked = if store.likes.remove(&key) {
            store.lessons[index].likes_count = store.lessons[index].likes_count.saturating_sub(1);
            false
        } else {
            store.likes.insert(key);
            store.lessons[index].likes_count += 1;
            true
        };
        Ok(LikeState {
            liked,
            likes_count: store.lessons[index].likes_count,
        })
    }

    async fn add_favorite(&self, lesson_id: &str) -> PortResult<()> {
        let mut store = self.enter("add_favorite").await?;
        let me = self.me(&store)?;
        let index = store.lesson_index(lesson_id)?;
        let entry = (lesson_id.to_string(), me.email);
        if store.favorites.contains(&entry) {
            return Err(PortError::Client {
                status: 409,
                message: "Lesson already saved".to_string(),
            });
        }
        store.favorites.push(entry);
        store.lessons[index].favorites_count += 1;
        Ok(())
    }

    async fn remove_favorite(&self, lesson_id: &str) -> PortResult<()> {
        let mut store = self.enter("remove_favorite").await?;
        let me = self.me(&store)?;
        let before = store.favorites.len();
        store
            .favorites
            .retain(|(l, e)| !(l == lesson_id && *e == me.email));
        if store.favorites.len() < before {
            if let Ok(index) = store.lesson_index(lesson_id) {
                store.lessons[index].favorites_count =
                    store.lessons[index].favorites_count.saturating_sub(1);
            }
        }
        Ok(())
    }

    async fn favorites(&self) -> PortResult<Vec<Favorite>> {
        let store = self.enter("favorites").await?;
        let me = self.me(&store)?;
        Ok(store
            .favorites
            .iter()
            .filter(|(_, e)| *e == me.email)
            .filter_map(|(l, _)| store.lessons.iter().find(|lesson| lesson.id == *l))
            .map(|lesson| Favorite {
                id: format!("fav-{}", lesson.id),
                lesson: lesson.clone(),
                saved_at: None,
            })
            .collect())
    }

    async fn report_lesson(&self, lesson_id: &str, report: &ReportDraft) -> PortResult<()> {
        let mut store = self.enter("report_lesson").await?;
        let me = self.me(&store)?;
        store.lesson_index(lesson_id)?;
        let report = Report {
            id: store.next_id("report"),
            lesson_id: lesson_id.to_string(),
            reporter: me.as_author(),
            reason: report.reason,
            message: report.message.clone(),
            created_at: store.timestamp(),
        };
        store.reports.push(report);
        Ok(())
    }

    async fn add_comment(&self, lesson_id: &str, text: &str) -> PortResult<Comment> {
        let mut store = self.enter("add_comment").await?;
        let me = self.me(&store)?;
        store.lesson_index(lesson_id)?;
        let comment = Comment {
            id: store.next_id("comment"),
            lesson_id: lesson_id.to_string(),
            author: me.as_author(),
            text: text.trim().to_string(),
            created_at: store.timestamp(),
        };
        store.comments.push(comment.clone());
        Ok(comment)
    }
}

#[async_trait]
impl UserService for MemoryPort {
    async fn current_user(&self) -> PortResult<User> {
        let store = self.enter("current_user").await?;
        self.me(&store)
    }

    async fn sync_user(&self) -> PortResult<User> {
        let mut store = self.enter("sync_user").await?;
        let email = self.email.clone().ok_or(PortError::Unauthorized)?;
        if let Some(user) = store.user_by_email(&email) {
            return Ok(user.clone());
        }
        let user = User {
            id: store.next_id("user"),
            name: email.split('@').next().unwrap_or_default().to_string(),
            email,
            photo_url: None,
            role: Role::User,
            is_premium: false,
            total_lessons: 0,
            created_at: store.timestamp(),
        };
        store.users.push(user.clone());
        Ok(user)
    }

    async fn update_profile(&self, update: &ProfileUpdate) -> PortResult<User> {
        let mut store = self.enter("update_profile").await?;
        let me = self.me(&store)?;
        let user = store
            .users
            .iter_mut()
            .find(|u| u.id == me.id)
            .ok_or_else(|| PortError::NotFound("User not found".to_string()))?;
        if let Some(name) = &update.name {
            user.name = name.trim().to_string();
        }
        if let Some(photo_url) = &update.photo_url {
            user.photo_url = Some(photo_url.clone());
        }
        Ok(user.clone())
    }
}

#[async_trait]
impl AdminService for MemoryPort {
    async fn stats(&self) -> PortResult<AdminStats> {
        let store = self.enter("admin_stats").await?;
        self.admin(&store)?;
        let reported: HashSet<&str> = store.reports.iter().map(|r| r.lesson_id.as_str()).collect();
        Ok(AdminStats {
            total_users: store.users.len() as u64,
            premium_users: store.users.iter().filter(|u| u.is_premium).count() as u64,
            total_lessons: store.lessons.len() as u64,
            public_lessons: store.lessons.iter().filter(|l| l.is_public()).count() as u64,
            reported_lessons: reported.len() as u64,
            todays_lessons: 0,
        })
    }

    async fn users(&self) -> PortResult<Vec<User>> {
        let store = self.enter("admin_users").await?;
        self.admin(&store)?;
        Ok(store.users.clone())
    }

    async fn set_user_role(&self, user_id: &str, role: Role) -> PortResult<()> {
        let mut store = self.enter("set_user_role").await?;
        self.admin(&store)?;
        let user = store
            .users
            .iter_mut()
            .find(|u| u.id == user_id)
            .ok_or_else(|| PortError::NotFound("User not found".to_string()))?;
        user.role = role;
        Ok(())
    }

    async fn delete_user(&self, user_id: &str) -> PortResult<()> {
        let mut store = self.enter("delete_user").await?;
        self.admin(&store)?;
        store.users.retain(|u| u.id != user_id);
        Ok(())
    }

    async fn lessons(&self) -> PortResult<Vec<Lesson>> {
        let store = self.enter("admin_lessons").await?;
        self.admin(&store)?;
        Ok(store.lessons.clone())
    }

    async fn set_featured(&self, lesson_id: &str, featured: bool) -> PortResult<()> {
        let mut store = self.enter("set_featured").await?;
        self.admin(&store)?;
        let index = store.lesson_index(lesson_id)?;
        store.lessons[index].is_featured = featured;
        Ok(())
    }

    async fn delete_lesson(&self, lesson_id: &str) -> PortResult<()> {
        let mut store = self.enter("admin_delete_lesson").await?;
        self.admin(&store)?;
        let index = store.lesson_index(lesson_id)?;
        store.lessons.remove(index);
        store.reports.retain(|r| r.lesson_id != lesson_id);
        Ok(())
    }

    async fn reported_lessons(&self) -> PortResult<Vec<ReportedLesson>> {
        let store = self.enter("reported_lessons").await?;
        self.admin(&store)?;
        let mut out: Vec<ReportedLesson> = Vec::new();
        for report in &store.reports {
            match out.iter_mut().find(|r| r.lesson.id == report.lesson_id) {
                Some(entry) => {
                    entry.report_count += 1;
                    entry.reports.push(report.clone());
                }
                None => {
                    if let Some(lesson) = store.lessons.iter().find(|l| l.id == report.lesson_id) {
                        out.push(ReportedLesson {
                            lesson: lesson.clone(),
                            report_count: 1,
                            reports: vec![report.clone()],
                        });
                    }
                }
            }
        }
        Ok(out)
    }

    async fn reported_lesson(&self, lesson_id: &str) -> PortResult<ReportedLesson> {
        let store = self.enter("reported_lesson").await?;
        self.admin(&store)?;
        let index = store.lesson_index(lesson_id)?;
        let reports: Vec<Report> = store
            .reports
            .iter()
            .filter(|r| r.lesson_id == lesson_id)
            .cloned()
            .collect();
        Ok(ReportedLesson {
            lesson: store.lessons[index].clone(),
            report_count: reports.len() as u64,
            reports,
        })
    }

    async fn dismiss_reports(&self, lesson_id: &str) -> PortResult<()> {
        let mut store = self.enter("dismiss_reports").await?;
        self.admin(&store)?;
        store.reports.retain(|r| r.lesson_id != lesson_id);
        Ok(())
    }
}

#[async_trait]
impl PaymentService for MemoryPort {
    async fn create_checkout_session(&self) -> PortResult<CheckoutSession> {
        let mut store = self.enter("create_checkout_session").await?;
        let me = self.me(&store)?;
        let id = store.next_id("cs_test");
        store.checkouts.insert(id.clone(), me.email);
        Ok(CheckoutSession {
            url: format!("https://checkout.example.com/pay/{}", id),
            id,
        })
    }

    async fn verify_session(&self, session_id: &str) -> PortResult<PaymentVerification> {
        let mut store = self.enter("verify_session").await?;
        let email = match store.checkouts.get(session_id) {
            Some(email) => email.clone(),
            None => {
                return Ok(PaymentVerification {
                    session_id: session_id.to_string(),
                    paid: false,
                    user: None,
                })
            }
        };
        let user = store.users.iter_mut().find(|u| u.email == email).map(|u| {
            u.is_premium = true;
            u.clone()
        });
        Ok(PaymentVerification {
            session_id: session_id.to_string(),
            paid: true,
            user,
        })
    }
}
