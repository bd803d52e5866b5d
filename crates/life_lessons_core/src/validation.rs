//! crates/life_lessons_core/src/validation.rs
//!
//! Client-side form validation. Everything here runs before a write is sent,
//! so a failure never costs a network round trip.

use std::fmt;

use crate::access::Viewer;
use crate::domain::{AccessLevel, LessonDraft, LessonPatch, ProfileUpdate, ReportDraft, ReportReason};

pub const MAX_TITLE_CHARS: usize = 120;
pub const MIN_DESCRIPTION_CHARS: usize = 20;
pub const MAX_COMMENT_CHARS: usize = 500;
pub const MAX_REPORT_MESSAGE_CHARS: usize = 500;

/// A single rejected form field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

/// Every problem found in one form submission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.errors.push(FieldError {
            field,
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    /// The message for a field, for rendering it inline.
    pub fn field(&self, field: &str) -> Option<&str> {
        self.errors
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.message.as_str())
    }

    /// `Ok` when nothing was pushed.
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .errors
            .iter()
            .map(|e| format!("{}: {}", e.field, e.message))
            .collect();
        f.write_str(&parts.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

fn check_title(title: &str, errors: &mut ValidationErrors) {
    let title = title.trim();
    if title.is_empty() {
        errors.push("title", "Title is required");
    } else if title.chars().count() > MAX_TITLE_CHARS {
        errors.push(
            "title",
            format!("Title must be at most {} characters", MAX_TITLE_CHARS),
        );
    }
}

fn check_description(description: &str, errors: &mut ValidationErrors) {
    if description.trim().chars().count() < MIN_DESCRIPTION_CHARS {
        errors.push(
            "description",
            format!(
                "Description must be at least {} characters",
                MIN_DESCRIPTION_CHARS
            ),
        );
    }
}

fn is_http_url(value: &str) -> bool {
    let value = value.trim();
    (value.starts_with("https://") && value.len() > "https://".len())
        || (value.starts_with("http://") && value.len() > "http://".len())
}

fn check_image(image_url: Option<&str>, field: &'static str, errors: &mut ValidationErrors) {
    if let Some(url) = image_url.filter(|u| !u.trim().is_empty()) {
        if !is_http_url(url) {
            errors.push(field, "Image must be an http(s) URL");
        }
    }
}

/// Checks the shape of a new lesson regardless of who submits it.
pub fn validate_draft(draft: &LessonDraft) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();
    check_title(&draft.title, &mut errors);
    check_description(&draft.description, &mut errors);
    check_image(draft.image_url.as_deref(), "image", &mut errors);
    errors.into_result()
}

/// Checks a new lesson for a specific author; premium lessons need a premium author.
pub fn validate_draft_for(viewer: &Viewer, draft: &LessonDraft) -> Result<(), ValidationErrors> {
    let mut errors = match validate_draft(draft) {
        Ok(()) => ValidationErrors::default(),
        Err(errors) => errors,
    };
    if draft.access_level == AccessLevel::Premium && !viewer.is_premium {
        errors.push("accessLevel", "Upgrade to Premium to create premium lessons");
    }
    errors.into_result()
}

pub fn validate_patch(viewer: &Viewer, patch: &LessonPatch) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();
    if let Some(title) = &patch.title {
        check_title(title, &mut errors);
    }
    if let Some(description) = &patch.description {
        check_description(description, &mut errors);
    }
    check_image(patch.image_url.as_deref(), "image", &mut errors);
    if patch.access_level == Some(AccessLevel::Premium) && !viewer.is_premium {
        errors.push("accessLevel", "Upgrade to Premium to create premium lessons");
    }
    errors.into_result()
}

pub fn validate_report(report: &ReportDraft) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();
    let message = report.message.as_deref().map(str::trim).unwrap_or("");
    if report.reason == ReportReason::Other && message.is_empty() {
        errors.push("message", "Please describe the problem");
    }
    if message.chars().count() > MAX_REPORT_MESSAGE_CHARS {
        errors.push(
            "message",
            format!("Message must be at most {} characters", MAX_REPORT_MESSAGE_CHARS),
        );
    }
    errors.into_result()
}

pub fn validate_comment(text: &str) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();
    let text = text.trim();
    if text.is_empty() {
        errors.push("text", "Comment cannot be empty");
    } else if text.chars().count() > MAX_COMMENT_CHARS {
        errors.push(
            "text",
            format!("Comment must be at most {} characters", MAX_COMMENT_CHARS),
        );
    }
    errors.into_result()
}

pub fn validate_profile(update: &ProfileUpdate) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();
    if let Some(name) = &update.name {
        if name.trim().is_empty() {
            errors.push("name", "Name cannot be empty");
        }
    }
    check_image(update.photo_url.as_deref(), "photoURL", &mut errors);
    errors.into_result()
}
