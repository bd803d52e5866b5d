//! crates/life_lessons_core/src/access.rs
//!
//! The access gate: pure predicates deciding route and content visibility
//! from who is looking (authenticated?, role, premium flag).

use chrono::{DateTime, Utc};

use crate::domain::{AccessLevel, Author, Category, EmotionalTone, Lesson, Role, User};

/// Everything the gate needs to know about the current viewer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Viewer {
    pub authenticated: bool,
    pub role: Role,
    pub is_premium: bool,
    pub user_id: Option<String>,
    pub email: Option<String>,
}

impl Viewer {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn from_user(user: &User) -> Self {
        Self {
            authenticated: true,
            role: user.role,
            is_premium: user.is_premium,
            user_id: Some(user.id.clone()),
            email: Some(user.email.clone()),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.authenticated && self.role == Role::Admin
    }

    /// True when the viewer is the author of something.
    pub fn owns(&self, author: &Author) -> bool {
        if !self.authenticated {
            return false;
        }
        if let (Some(mine), Some(theirs)) = (&self.user_id, &author.id) {
            if mine == theirs {
                return true;
            }
        }
        match (self.email.as_deref(), author.email_key()) {
            (Some(mine), Some(theirs)) => mine.trim().to_lowercase() == theirs,
            _ => false,
        }
    }
}

/// What a route demands of its viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteRequirement {
    Public,
    Authenticated,
    Admin,
    Premium,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Redirect {
    Login,
    NotFound,
    Pricing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessDecision {
    pub visible: bool,
    pub blurred: bool,
    pub redirect_to: Option<Redirect>,
}

impl AccessDecision {
    fn allow() -> Self {
        Self {
            visible: true,
            blurred: false,
            redirect_to: None,
        }
    }

    fn blur() -> Self {
        Self {
            visible: true,
            blurred: true,
            redirect_to: None,
        }
    }

    fn redirect(to: Redirect) -> Self {
        Self {
            visible: false,
            blurred: false,
            redirect_to: Some(to),
        }
    }
}

/// Whole-route gating. Checks run in a fixed order: authentication, then
/// role, then premium, so an anonymous visitor on an admin route is sent to
/// login rather than to not-found.
pub fn resolve_access(viewer: &Viewer, requirement: RouteRequirement) -> AccessDecision {
    if requirement == RouteRequirement::Public {
        return AccessDecision::allow();
    }
    if !viewer.authenticated {
        return AccessDecision::redirect(Redirect::Login);
    }
    if requirement == RouteRequirement::Admin && viewer.role != Role::Admin {
        return AccessDecision::redirect(Redirect::NotFound);
    }
    if requirement == RouteRequirement::Premium && !viewer.is_premium {
        return AccessDecision::redirect(Redirect::Pricing);
    }
    AccessDecision::allow()
}

/// In-place gating of a single lesson. Premium content is obscured for
/// non-premium viewers instead of being removed; private lessons exist only
/// for their author and admins. Authors and admins always see full content.
pub fn resolve_content(viewer: &Viewer, lesson: &Lesson) -> AccessDecision {
    let privileged = viewer.is_admin() || viewer.owns(&lesson.author);
    if !lesson.is_public() && !privileged {
        return AccessDecision::redirect(Redirect::NotFound);
    }
    if lesson.access_level == AccessLevel::Premium && !viewer.is_premium && !privileged {
        return AccessDecision::blur();
    }
    AccessDecision::allow()
}

/// A lesson as it may be rendered for a particular viewer. Metadata is
/// always carried; the body is withheld when the card is blurred.
#[derive(Debug, Clone, PartialEq)]
pub struct LessonCard {
    pub id: String,
    pub title: String,
    pub category: Category,
    pub emotional_tone: EmotionalTone,
    pub access_level: AccessLevel,
    pub image_url: Option<String>,
    pub author: Author,
    pub likes_count: u64,
    pub favorites_count: u64,
    pub views: u64,
    pub created_at: Option<DateTime<Utc>>,
    pub is_featured: bool,
    pub description: Option<String>,
    pub blurred: bool,
}

impl LessonCard {
    /// Projects a lesson for `viewer`, or `None` if the viewer may not see it at all.
    pub fn project(viewer: &Viewer, lesson: &Lesson) -> Option<Self> {
        let decision = resolve_content(viewer, lesson);
        if !decision.visible {
            return None;
        }
        Some(Self {
            id: lesson.id.clone(),
            title: lesson.title.clone(),
            category: lesson.category,
            emotional_tone: lesson.emotional_tone,
            access_level: lesson.access_level,
            image_url: lesson.image_url.clone(),
            author: lesson.author.clone(),
            likes_count: lesson.likes_count,
            favorites_count: lesson.favorites_count,
            views: lesson.views,
            created_at: lesson.created_at,
            is_featured: lesson.is_featured,
            description: (!decision.blurred).then(|| lesson.description.clone()),
            blurred: decision.blurred,
        })
    }

    /// The first `max_chars` characters of the body, with an ellipsis when cut.
    pub fn excerpt(&self, max_chars: usize) -> Option<String> {
        let text = self.description.as_deref()?;
        if text.chars().count() <= max_chars {
            return Some(text.to_string());
        }
        let cut: String = text.chars().take(max_chars).collect();
        Some(format!("{}...", cut.trim_end()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Visibility;

    fn lesson(access_level: AccessLevel, visibility: Visibility) -> Lesson {
        Lesson {
            id: "l1".to_string(),
            title: "Sleep is a tool".to_string(),
            description: "Rest made me better at everything else I cared about.".to_string(),
            category: Category::Mindset,
            emotional_tone: EmotionalTone::Realization,
            access_level,
            visibility,
            image_url: None,
            author: Author {
                id: Some("author".to_string()),
                name: Some("Ari".to_string()),
                email: Some("ari@example.com".to_string()),
                photo_url: None,
            },
            likes_count: 12,
            favorites_count: 3,
            views: 40,
            created_at: None,
            is_featured: false,
            liked_by_viewer: false,
            saved_by_viewer: false,
        }
    }

    fn member(role: Role, is_premium: bool) -> Viewer {
        Viewer {
            authenticated: true,
            role,
            is_premium,
            user_id: Some("someone".to_string()),
            email: Some("someone@example.com".to_string()),
        }
    }

    #[test]
    fn anonymous_admin_route_redirects_to_login_not_forbidden() {
        let decision = resolve_access(&Viewer::anonymous(), RouteRequirement::Admin);
        assert_eq!(decision.redirect_to, Some(Redirect::Login));
        assert!(!decision.visible);
    }

    #[test]
    fn non_admin_is_sent_to_not_found() {
        let decision = resolve_access(&member(Role::User, true), RouteRequirement::Admin);
        assert_eq!(decision.redirect_to, Some(Redirect::NotFound));
    }

    #[test]
    fn premium_route_redirects_free_members_to_pricing() {
        let decision = resolve_access(&member(Role::User, false), RouteRequirement::Premium);
        assert_eq!(decision.redirect_to, Some(Redirect::Pricing));
        let anonymous = resolve_access(&Viewer::anonymous(), RouteRequirement::Premium);
        assert_eq!(anonymous.redirect_to, Some(Redirect::Login));
    }

    #[test]
    fn public_and_satisfied_routes_are_visible() {
        assert!(resolve_access(&Viewer::anonymous(), RouteRequirement::Public).visible);
        assert!(resolve_access(&member(Role::Admin, false), RouteRequirement::Admin).visible);
        assert!(resolve_access(&member(Role::User, false), RouteRequirement::Authenticated).visible);
    }

    #[test]
    fn premium_lesson_is_blurred_for_free_viewer_with_metadata_intact() {
        let l = lesson(AccessLevel::Premium, Visibility::Public);
        let card = LessonCard::project(&member(Role::User, false), &l).expect("visible");
        assert!(card.blurred);
        assert_eq!(card.description, None);
        assert_eq!(card.title, l.title);
        assert_eq!(card.category, l.category);
        assert_eq!(card.likes_count, 12);
        assert_eq!(card.favorites_count, 3);
    }

    #[test]
    fn premium_viewer_sees_premium_lesson_unblurred() {
        let l = lesson(AccessLevel::Premium, Visibility::Public);
        let card = LessonCard::project(&member(Role::User, true), &l).expect("visible");
        assert!(!card.blurred);
        assert_eq!(card.description.as_deref(), Some(l.description.as_str()));
    }

    #[test]
    fn authors_see_their_own_premium_and_private_lessons() {
        let mut author = member(Role::User, false);
        author.user_id = Some("author".to_string());
        let premium = lesson(AccessLevel::Premium, Visibility::Private);
        assert_eq!(resolve_content(&author, &premium), AccessDecision::allow());
        assert_eq!(
            resolve_content(&member(Role::User, true), &premium).redirect_to,
            Some(Redirect::NotFound)
        );
        assert!(!resolve_content(&member(Role::Admin, false), &premium).blurred);
    }

    #[test]
    fn excerpt_cuts_on_characters() {
        let l = lesson(AccessLevel::Free, Visibility::Public);
        let card = LessonCard::project(&Viewer::anonymous(), &l).expect("visible");
        assert_eq!(card.excerpt(5).as_deref(), Some("Rest..."));
        assert_eq!(card.excerpt(500).as_deref(), Some(l.description.as_str()));
    }
}
