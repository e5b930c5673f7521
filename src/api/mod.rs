//! Wire payloads exchanged with the NOVA backend.

pub mod client;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::message::Artifact;

pub use client::{ApiClient, ApiError, ChatBackend};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(default)]
    pub id: u64,
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub profile: UserProfile,
}

impl User {
    /// "First Last" when a real name is known, otherwise the username.
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name.trim(), self.last_name.trim());
        let full = full.trim();
        if full.is_empty() {
            self.username.clone()
        } else {
            full.to_string()
        }
    }
}

#[derive(Serialize)]
pub struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

#[derive(Deserialize)]
pub struct TokenResponse {
    pub access: String,
    pub refresh: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Deserialize)]
pub struct RegisterResponse {
    pub access: String,
    pub refresh: String,
    pub user: User,
}

#[derive(Serialize)]
pub struct RefreshRequest<'a> {
    pub refresh: &'a str,
}

#[derive(Deserialize)]
pub struct RefreshResponse {
    pub access: String,
    #[serde(default)]
    pub refresh: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ProfilePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
}

impl ProfilePatch {
    pub fn is_empty(&self) -> bool {
        self.first_name.is_none() && self.last_name.is_none() && self.bio.is_none()
    }
}

#[derive(Serialize)]
pub struct ChatRequest<'a> {
    pub message: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChatReply {
    pub response: String,
    #[serde(default)]
    pub artifacts: Option<Vec<Artifact>>,
}

fn first_message(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Array(items) => items.iter().find_map(first_message),
        _ => None,
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Pull the first human-readable validation message out of an error body.
///
/// Fields named in `preferred` are consulted first, in order, then the generic
/// `detail`/`error`/`non_field_errors` keys, then any remaining field.
pub fn first_field_error(body: &str, preferred: &[&str]) -> Option<String> {
    let value: Value = serde_json::from_str(body.trim()).ok()?;
    let object = value.as_object()?;

    let generic = ["detail", "error", "non_field_errors", "message"];
    let message = preferred
        .iter()
        .chain(generic.iter())
        .find_map(|key| object.get(*key).and_then(first_message))
        .or_else(|| object.values().find_map(first_message))?;

    let collapsed = collapse_whitespace(&message);
    if collapsed.is_empty() {
        None
    } else {
        Some(collapsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_name_prefers_real_name() {
        let mut user: User = serde_json::from_str(r#"{"username":"alice"}"#).unwrap();
        assert_eq!(user.display_name(), "alice");

        user.first_name = "Alice".to_string();
        user.last_name = "Liddell".to_string();
        assert_eq!(user.display_name(), "Alice Liddell");
    }

    #[test]
    fn user_parses_full_profile_payload() {
        let user: User = serde_json::from_str(
            r#"{
                "id": 7,
                "username": "alice",
                "email": "alice@example.com",
                "first_name": "Alice",
                "last_name": "L",
                "profile": {"bio": "hi", "avatar": null, "created_at": "2024-01-01T00:00:00Z"}
            }"#,
        )
        .unwrap();
        assert_eq!(user.id, 7);
        assert_eq!(user.profile.bio, "hi");
        assert_eq!(user.profile.avatar, None);
    }

    #[test]
    fn first_field_error_honours_preference_order() {
        let body = r#"{"email": ["Enter a valid email address."], "username": ["A user with that username already exists."]}"#;
        assert_eq!(
            first_field_error(body, &["username", "email"]).as_deref(),
            Some("A user with that username already exists.")
        );
        assert_eq!(
            first_field_error(body, &["email"]).as_deref(),
            Some("Enter a valid email address.")
        );
    }

    #[test]
    fn first_field_error_reads_detail_and_other_fields() {
        assert_eq!(
            first_field_error(
                r#"{"detail": "No active account found with the given credentials"}"#,
                &[]
            )
            .as_deref(),
            Some("No active account found with the given credentials")
        );
        assert_eq!(
            first_field_error(r#"{"password": ["This field may not be blank."]}"#, &["username"])
                .as_deref(),
            Some("This field may not be blank.")
        );
    }

    #[test]
    fn first_field_error_ignores_non_json() {
        assert_eq!(first_field_error("<html>502</html>", &[]), None);
        assert_eq!(first_field_error("[]", &[]), None);
        assert_eq!(first_field_error(r#"{"detail": "   "}"#, &[]), None);
    }

    #[test]
    fn chat_reply_artifacts_are_optional() {
        let reply: ChatReply = serde_json::from_str(r#"{"response":"Echo: hi"}"#).unwrap();
        assert_eq!(reply.response, "Echo: hi");
        assert!(reply.artifacts.is_none());
    }
}
