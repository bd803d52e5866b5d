//! services/client/src/cache/keys.rs
//!
//! The well-known cache keys every view and mutation agrees on.

use life_lessons_core::domain::LessonFilter;

use super::key::QueryKey;

/// Every lesson-derived read, public or private.
pub fn lessons() -> QueryKey {
    QueryKey::new(["lessons"])
}

pub fn public_lessons_all() -> QueryKey {
    QueryKey::new(["lessons", "public"])
}

pub fn public_lessons(filter: &LessonFilter) -> QueryKey {
    public_lessons_all().params(filter.to_params())
}

pub fn featured_lessons() -> QueryKey {
    QueryKey::new(["lessons", "featured"])
}

pub fn lesson(lesson_id: &str) -> QueryKey {
    QueryKey::new(["lessons", "detail", lesson_id])
}

pub fn comments(lesson_id: &str) -> QueryKey {
    QueryKey::new(["lessons", "comments", lesson_id])
}

pub fn my_lessons() -> QueryKey {
    QueryKey::new(["lessons", "my"])
}

pub fn favorites() -> QueryKey {
    QueryKey::new(["lessons", "favorites"])
}

pub fn current_user() -> QueryKey {
    QueryKey::new(["users", "me"])
}

pub fn user_stats() -> QueryKey {
    QueryKey::new(["users", "stats"])
}

/// Every admin read.
pub fn admin() -> QueryKey {
    QueryKey::new(["admin"])
}

pub fn admin_stats() -> QueryKey {
    QueryKey::new(["admin", "stats"])
}

pub fn admin_users() -> QueryKey {
    QueryKey::new(["admin", "users"])
}

pub fn admin_lessons() -> QueryKey {
    QueryKey::new(["admin", "lessons"])
}

pub fn reported_lessons() -> QueryKey {
    QueryKey::new(["admin", "reported-lessons"])
}

pub fn reported_lesson(lesson_id: &str) -> QueryKey {
    QueryKey::new(["admin", "reported-lessons", lesson_id])
}
