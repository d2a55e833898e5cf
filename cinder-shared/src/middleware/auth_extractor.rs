use std::sync::Arc;

use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;
use axum::http::HeaderMap;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};

use crate::errors::{AppError, ErrorCode};
use crate::types::auth::{AuthUser, Claims, UserRole};
use crate::types::id;

/// Decoding secret for bearer tokens. Application state supplies it through
/// `FromRef`, so the configured secret is the one that validates requests.
#[derive(Clone)]
pub struct JwtSecret(pub String);

impl<T> FromRef<Arc<T>> for JwtSecret
where
    JwtSecret: FromRef<T>,
{
    fn from_ref(input: &Arc<T>) -> Self {
        JwtSecret::from_ref(&**input)
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtSecret: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = extract_bearer_token(&parts.headers)?;
        let secret = JwtSecret::from_ref(state);
        let claims = validate_jwt(&token, &secret.0)?;

        if claims.is_expired() {
            return Err(AppError::new(ErrorCode::TokenExpired, "token has expired"));
        }

        Ok(AuthUser::from(claims))
    }
}

fn extract_bearer_token(headers: &HeaderMap) -> Result<String, AppError> {
    let auth_header = headers
        .get("Authorization")
        .ok_or_else(|| AppError::new(ErrorCode::Unauthorized, "missing authorization header"))?
        .to_str()
        .map_err(|_| AppError::new(ErrorCode::Unauthorized, "invalid authorization header"))?;

    if !auth_header.starts_with("Bearer ") {
        return Err(AppError::new(ErrorCode::Unauthorized, "authorization header must use Bearer scheme"));
    }

    Ok(auth_header[7..].to_string())
}

fn validate_jwt(token: &str, jwt_secret: &str) -> Result<Claims, AppError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(jwt_secret.as_bytes()),
        &validation,
    )
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
            AppError::new(ErrorCode::TokenExpired, "token has expired")
        }
        _ => AppError::new(ErrorCode::TokenInvalid, format!("invalid token: {e}")),
    })?;

    // The subject claim becomes a storage key, so it obeys id well-formedness.
    if !id::is_well_formed(&token_data.claims.sub) {
        return Err(AppError::new(ErrorCode::TokenInvalid, "token subject is not a valid identifier"));
    }

    Ok(token_data.claims)
}

/// Require Admin role
pub struct AdminUser(pub AuthUser);

#[axum::async_trait]
impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
    JwtSecret: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if user.role != UserRole::Admin {
            return Err(AppError::new(ErrorCode::Forbidden, "admin access required"));
        }
        Ok(Self(user))
    }
}

/// Require Matchmaker or Admin role
pub struct MatchmakerUser(pub AuthUser);

#[axum::async_trait]
impl<S> FromRequestParts<S> for MatchmakerUser
where
    S: Send + Sync,
    JwtSecret: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if !matches!(user.role, UserRole::Matchmaker | UserRole::Admin) {
            return Err(AppError::new(ErrorCode::Forbidden, "matchmaker access required"));
        }
        Ok(Self(user))
    }
}

#[cfg(test)]
mod tests {
    use jsonwebtoken::{encode, EncodingKey, Header};

    use super::*;

    fn token_for(claims: &Claims, secret: &str) -> String {
        encode(
            &Header::default(),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn validation_uses_the_supplied_secret() {
        let claims = Claims::new("u1", UserRole::Regular, 3600);
        let token = token_for(&claims, "configured-secret");

        let decoded = validate_jwt(&token, "configured-secret").unwrap();
        assert_eq!(decoded.sub, "u1");

        let err = validate_jwt(&token, "some-other-secret").unwrap_err();
        assert_eq!(err.error_code(), ErrorCode::TokenInvalid);
    }

    #[test]
    fn token_subject_must_be_well_formed() {
        let claims = Claims::new("bad id", UserRole::Regular, 3600);
        let token = token_for(&claims, "configured-secret");

        let err = validate_jwt(&token, "configured-secret").unwrap_err();
        assert_eq!(err.error_code(), ErrorCode::TokenInvalid);
    }
}
