// Per-entity validation, decoupled from persistence. Callers look up the
// facts that need the database (author exists, email taken) and pass them in.
use serde::{Deserialize, Serialize};
use std::fmt;

/// One failed rule: the logical field and a full, human-readable message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.push(FieldError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.0.iter()
    }

    /// First message recorded for `field`.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.message.as_str())
    }

    pub fn full_messages(&self) -> Vec<String> {
        self.0.iter().map(|e| e.message.clone()).collect()
    }

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
        write!(f, "{}", self.full_messages().join(", "))
    }
}

impl FromIterator<FieldError> for ValidationErrors {
    fn from_iter<I: IntoIterator<Item = FieldError>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

fn blank(value: &str) -> bool {
    value.trim().is_empty()
}

pub fn validate_post(title: &str, body: &str, author_exists: bool) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    if blank(title) {
        errors.add("title", "Title can't be blank");
    }
    if blank(body) {
        errors.add("body", "Body can't be blank");
    }
    if !author_exists {
        errors.add("user_id", "User must exist");
    }
    errors
}

pub fn validate_comment(body: &str, author_exists: bool, post_exists: bool) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    if blank(body) {
        errors.add("body", "Body can't be blank");
    }
    if !author_exists {
        errors.add("user_id", "User must exist");
    }
    if !post_exists {
        errors.add("post_id", "Post must exist");
    }
    errors
}

pub fn validate_user(name: &str, email: &str, email_taken: bool) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    if blank(name) {
        errors.add("name", "Name can't be blank");
    }
    if blank(email) {
        errors.add("email", "Email can't be blank");
    } else if !looks_like_email(email.trim()) {
        errors.add("email", "Email is invalid");
    } else if email_taken {
        errors.add("email", "Email has already been taken");
    }
    errors
}

fn looks_like_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

/// Heuristic for servers that only send free-text messages: a message is
/// attributed to the first field whose name (underscores read as spaces,
/// `_id` suffix dropped) appears in it, case-insensitively. Unmatched
/// messages are attached to `"base"`.
pub fn map_messages_to_fields(messages: &[String], fields: &[&str]) -> ValidationErrors {
    messages
        .iter()
        .map(|message| {
            let lowered = message.to_lowercase();
            let field = fields
                .iter()
                .find(|field| {
                    let needle = field.trim_end_matches("_id").replace('_', " ");
                    lowered.contains(&needle)
                })
                .copied()
                .unwrap_or("base");
            FieldError {
                field: field.to_string(),
                message: message.clone(),
            }
        })
        .collect()
}
