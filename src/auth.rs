use actix_web::{dev::ServiceRequest, http};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use mongodb::bson::{doc, oid::ObjectId};
use serde::{Deserialize, Serialize};

use crate::app_state::AppState;
use crate::errors::ApiError;
use crate::models::User;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
}

/// The authenticated-user context attached to every request by the
/// `Authentication` middleware. Carries no sensitive fields.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: ObjectId,
    pub name: String,
    pub email: String,
}

impl From<&User> for AuthUser {
    fn from(user: &User) -> Self {
        AuthUser {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
        }
    }
}

// JWT Creation
pub fn create_jwt(user_id: &str, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
    let expiration = Utc::now() + Duration::hours(24);
    let claims = Claims {
        sub: user_id.to_string(),
        exp: expiration.timestamp() as usize,
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_ref()))
}

// JWT Validation
pub fn validate_jwt(token: &str, secret: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &Validation::default(),
    )?;
    Ok(token_data.claims)
}

/// Picks the bearer credential: the `accessToken` cookie wins over the
/// `Authorization: Bearer` header.
fn credential(cookie: Option<&str>, auth_header: Option<&str>) -> Option<String> {
    if let Some(token) = cookie {
        return Some(token.to_string());
    }
    auth_header
        .filter(|h| h.starts_with("Bearer "))
        .map(|h| h.trim_start_matches("Bearer ").trim().to_string())
}

/// Validates the request credential and resolves it to a stored user.
/// Every failure mode collapses to `Unauthorized`, keeping the underlying
/// message when there is one.
pub async fn authenticate(req: &ServiceRequest, state: &AppState) -> Result<AuthUser, ApiError> {
    let cookie = req
        .request()
        .cookie("accessToken")
        .map(|c| c.value().to_string());
    let header = req
        .headers()
        .get(http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .map(str::to_string);

    let token = credential(cookie.as_deref(), header.as_deref())
        .ok_or_else(|| ApiError::Unauthorized("Unauthorized access".to_string()))?;

    let claims = validate_jwt(&token, &state.config.jwt_secret)
        .map_err(|e| ApiError::Unauthorized(e.to_string()))?;

    let subject = ObjectId::parse_str(&claims.sub)
        .map_err(|_| ApiError::Unauthorized("Invalid access token".to_string()))?;

    let user = state
        .mongodb
        .users()
        .find_one(doc! { "_id": subject })
        .await
        .map_err(|e| ApiError::Unauthorized(e.to_string()))?
        .ok_or_else(|| ApiError::Unauthorized("Invalid access token".to_string()))?;

    Ok(AuthUser::from(&user))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jwt_round_trip_preserves_subject() {
        let user_id = ObjectId::new().to_hex();
        let token = create_jwt(&user_id, "test-secret").unwrap();
        let claims = validate_jwt(&token, "test-secret").unwrap();
        assert_eq!(claims.sub, user_id);
    }

    #[test]
    fn jwt_with_wrong_secret_is_rejected() {
        let token = create_jwt("someone", "secret-a").unwrap();
        assert!(validate_jwt(&token, "secret-b").is_err());
    }

    #[test]
    fn expired_jwt_is_rejected() {
        let claims = Claims {
            sub: "someone".to_string(),
            exp: (Utc::now() - Duration::hours(1)).timestamp() as usize,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();
        assert!(validate_jwt(&token, "test-secret").is_err());
    }

    #[test]
    fn cookie_takes_precedence_over_header() {
        let token = credential(Some("cookie-token"), Some("Bearer header-token"));
        assert_eq!(token.as_deref(), Some("cookie-token"));
    }

    #[test]
    fn header_requires_bearer_prefix() {
        assert_eq!(
            credential(None, Some("Bearer abc")).as_deref(),
            Some("abc")
        );
        assert!(credential(None, Some("Basic abc")).is_none());
        assert!(credential(None, None).is_none());
    }
}
