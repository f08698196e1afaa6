// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! JWT authentication middleware.
//!
//! Sessions are issued by the platform's login service; this API only
//! verifies them. A token carries the user ID and the platform role.

use crate::error::AppError;
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Session cookie name.
pub const SESSION_COOKIE: &str = "coach_sync_token";

/// Platform role of the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Coach,
    Athlete,
    Admin,
}

/// JWT claims structure.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (platform user ID)
    pub sub: String,
    pub role: Role,
    /// Expiration time (Unix timestamp)
    pub exp: usize,
    /// Issued at (Unix timestamp)
    pub iat: usize,
}

/// Authenticated user extracted from JWT.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: u64,
    pub role: Role,
}

impl AuthUser {
    /// Coach endpoints are also open to admins.
    pub fn require_coach(&self) -> Result<(), AppError> {
        match self.role {
            Role::Coach | Role::Admin => Ok(()),
            Role::Athlete => Err(AppError::Forbidden(
                "Only coaches can access this endpoint".to_string(),
            )),
        }
    }

    pub fn require_athlete(&self) -> Result<(), AppError> {
        match self.role {
            Role::Athlete => Ok(()),
            _ => Err(AppError::Forbidden(
                "Only athletes can access this endpoint".to_string(),
            )),
        }
    }
}

/// Middleware that requires valid JWT authentication.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    // Cookie first, then bearer header
    let token = if let Some(cookie) = jar.get(SESSION_COOKIE) {
        cookie.value().to_string()
    } else {
        let auth_header = request
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok());

        match auth_header.and_then(|h| h.strip_prefix("Bearer ")) {
            Some(token) => token.to_string(),
            None => return Err(StatusCode::UNAUTHORIZED),
        }
    };

    let key = DecodingKey::from_secret(&state.config.jwt_signing_key);
    let validation = Validation::new(Algorithm::HS256);

    let token_data =
        decode::<Claims>(&token, &key, &validation).map_err(|_| StatusCode::UNAUTHORIZED)?;

    let user_id: u64 = token_data
        .claims
        .sub
        .parse()
        .map_err(|_| StatusCode::UNAUTHORIZED)?;

    request.extensions_mut().insert(AuthUser {
        user_id,
        role: token_data.claims.role,
    });

    Ok(next.run(request).await)
}

/// Create a session JWT. Used by tests and local tooling.
pub fn create_jwt(user_id: u64, role: Role, signing_key: &[u8]) -> anyhow::Result<String> {
    use jsonwebtoken::{encode, EncodingKey, Header};
    use std::time::{SystemTime, UNIX_EPOCH};

    let now = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs() as usize;

    let claims = Claims {
        sub: user_id.to_string(),
        role,
        iat: now,
        exp: now + 7 * 24 * 60 * 60,
    };

    Ok(encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(signing_key),
    )?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admins_pass_coach_checks_only() {
        let admin = AuthUser {
            user_id: 1,
            role: Role::Admin,
        };
        assert!(admin.require_coach().is_ok());
        assert!(matches!(admin.require_athlete(), Err(AppError::Forbidden(_))));

        let athlete = AuthUser {
            user_id: 2,
            role: Role::Athlete,
        };
        assert!(athlete.require_athlete().is_ok());
        assert!(athlete.require_coach().is_err());
    }

    #[test]
    fn token_round_trips_role() {
        let key = b"unit-test-signing-key-32-bytes!!";
        let token = create_jwt(99, Role::Coach, key).unwrap();
        let data = decode::<Claims>(
            &token,
            &DecodingKey::from_secret(key),
            &Validation::new(Algorithm::HS256),
        )
        .unwrap();
        assert_eq!(data.claims.sub, "99");
        assert_eq!(data.claims.role, Role::Coach);
    }
}
