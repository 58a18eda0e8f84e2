// File: user.rs

use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

/// A user document as stored in the `users` collection. The token and
/// password fields exist only here; they must never cross into a projection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub name: String,
    pub email: String,
    pub password: String,
    pub refresh_token: Option<String>,
    pub email_verify_token: Option<String>,
    pub email_verify_token_expiry: Option<chrono::DateTime<chrono::Utc>>,
    pub forgot_password_token: Option<String>,
}

/// The only user shape allowed inside chat/group projections. Converting
/// through this type is what strips the sensitive fields; no other code path
/// serializes a `User` outward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicUser {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub email: String,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        PublicUser {
            id: user.id.to_hex(),
            name: user.name.clone(),
            email: user.email.clone(),
        }
    }
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        PublicUser::from(&user)
    }
}

#[cfg(test)]
pub(crate) fn sample_user(name: &str) -> User {
    User {
        id: ObjectId::new(),
        name: name.to_string(),
        email: format!("{}@example.com", name),
        password: "hashed-secret".to_string(),
        refresh_token: Some("refresh-secret".to_string()),
        email_verify_token: Some("verify-secret".to_string()),
        email_verify_token_expiry: Some(chrono::Utc::now()),
        forgot_password_token: Some("forgot-secret".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_user_keeps_identity_fields() {
        let user = sample_user("alice");
        let public = PublicUser::from(&user);
        assert_eq!(public.id, user.id.to_hex());
        assert_eq!(public.name, "alice");
        assert_eq!(public.email, "alice@example.com");
    }

    #[test]
    fn public_user_json_carries_no_sensitive_fields() {
        let public = PublicUser::from(sample_user("bob"));
        let json = serde_json::to_string(&public).unwrap();
        for leaked in [
            "password",
            "refreshToken",
            "emailVerifyToken",
            "emailVerifyTokenExpiry",
            "forgotPasswordToken",
            "secret",
        ] {
            assert!(!json.contains(leaked), "projection leaked `{}`", leaked);
        }
    }
}
