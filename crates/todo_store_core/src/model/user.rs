//! Account record looked up by id or email.

use super::EntityId;
use serde::{Deserialize, Serialize};

pub type UserId = EntityId;

/// Account record.
///
/// `email` is stored in normalized form (see [`normalize_email`]) and is
/// unique across all users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(default)]
    pub id: Option<UserId>,
    pub email: String,
    /// Opaque credential digest produced by the caller; stored verbatim.
    pub password_hash: String,
}

impl User {
    /// Creates an unsaved user.
    pub fn new(email: impl Into<String>, password_hash: impl Into<String>) -> Self {
        Self {
            id: None,
            email: email.into(),
            password_hash: password_hash.into(),
        }
    }
}

/// Canonical form used for storing and matching emails: surrounding
/// whitespace removed, ASCII letters lowercased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::{normalize_email, User};

    #[test]
    fn normalize_email_trims_and_lowercases_ascii() {
        assert_eq!(normalize_email("  Alice@Example.COM\n"), "alice@example.com");
        assert_eq!(normalize_email("ÉLodie@x.com"), "Élodie@x.com");
    }

    #[test]
    fn serializes_password_hash_in_camel_case() {
        let user = User::new("a@x.com", "$argon2id$stub");
        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["passwordHash"], "$argon2id$stub");
        assert_eq!(json["id"], serde_json::Value::Null);
    }
}
