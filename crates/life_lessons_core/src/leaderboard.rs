//! crates/life_lessons_core/src/leaderboard.rs
//!
//! "Top contributors" aggregation over an already-fetched list of public lessons.
//!
//! The list comes from a capped fetch (see `LEADERBOARD_FETCH_LIMIT` in the
//! client config), so counts reflect that window only, not the backend's totals.

use std::collections::HashMap;

use crate::domain::Lesson;

pub const DEFAULT_TOP_CONTRIBUTORS: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contributor {
    /// Normalised (trimmed, lowercased) email, the grouping key.
    pub email: String,
    pub name: String,
    pub photo_url: Option<String>,
    pub lesson_count: u64,
}

/// Groups lessons by author email, counts them and returns the `limit`
/// biggest contributors. Ties keep the order in which authors first appear
/// in `lessons`. Lessons whose author has no usable email are skipped.
pub fn top_contributors(lessons: &[Lesson], limit: usize) -> Vec<Contributor> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut contributors: Vec<Contributor> = Vec::new();

    for lesson in lessons {
        let Some(email) = lesson.author.email_key() else {
            continue;
        };
        match index.get(&email) {
            Some(&i) => contributors[i].lesson_count += 1,
            None => {
                index.insert(email.clone(), contributors.len());
                contributors.push(Contributor {
                    name: lesson.author.display_name().to_string(),
                    photo_url: lesson.author.photo_url.clone(),
                    email,
                    lesson_count: 1,
                });
            }
        }
    }

    // `sort_by` is stable, so equal counts keep first-appearance order.
    contributors.sort_by(|a, b| b.lesson_count.cmp(&a.lesson_count));
    contributors.truncate(limit);
    contributors
}
