//! Session user identity.

use serde::{Deserialize, Serialize};

/// The authenticated user carried by a session.
///
/// Sessions start anonymous; a user is attached once the backend's auth flow
/// has signed someone in. Page handlers only read it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    /// Backend user id.
    pub id: String,
    /// Email address, when the backend reports one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl SessionUser {
    /// Creates a user with only an id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: None,
        }
    }

    /// Sets the email.
    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_camel_case_without_missing_email() {
        let user = SessionUser::new("u-1");
        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json, serde_json::json!({ "id": "u-1" }));

        let user = user.with_email("a@example.com");
        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["email"], "a@example.com");
    }
}
