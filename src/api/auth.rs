use axum::{extract::State, http::{header, HeaderMap, StatusCode}, Json};
use serde::Deserialize;
use crate::api::{ApiError, AppState};
use crate::auth::{OAuthProvider, RegistrationForm, Session};

#[derive(Debug, Deserialize)]
pub struct Credentials { pub email: String, pub password: String }

#[derive(Debug, Deserialize)]
pub struct OAuthRequest { pub provider: OAuthProvider }

#[derive(Debug, Deserialize)]
pub struct PasswordResetRequest { pub email: String }

/// Session token from an `Authorization: Bearer <token>` header.
pub(crate) fn bearer(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    value.strip_prefix("Bearer ").map(str::trim).filter(|t| !t.is_empty())
}

pub async fn current_session(State(s): State<AppState>, headers: HeaderMap) -> Json<Option<Session>> {
    Json(s.sessions.current(bearer(&headers)).await)
}

pub async fn sign_in(State(s): State<AppState>, Json(c): Json<Credentials>) -> Result<Json<Session>, ApiError> {
    Ok(Json(s.sessions.sign_in(&c.email, &c.password).await?))
}

pub async fn sign_in_with_oauth(State(s): State<AppState>, Json(r): Json<OAuthRequest>) -> Result<Json<Session>, ApiError> {
    Ok(Json(s.sessions.sign_in_with_oauth(r.provider).await?))
}

pub async fn sign_in_admin(State(s): State<AppState>, Json(c): Json<Credentials>) -> Result<Json<Session>, ApiError> {
    Ok(Json(s.sessions.sign_in_admin(&c.email, &c.password).await?))
}

pub async fn register(State(s): State<AppState>, Json(form): Json<RegistrationForm>) -> Result<(StatusCode, Json<Session>), ApiError> {
    Ok((StatusCode::CREATED, Json(s.sessions.register(&form).await?)))
}

pub async fn password_reset(State(s): State<AppState>, Json(r): Json<PasswordResetRequest>) -> Result<StatusCode, ApiError> {
    s.sessions.send_password_reset(&r.email).await?;
    Ok(StatusCode::ACCEPTED)
}

pub async fn sign_out(State(s): State<AppState>, headers: HeaderMap) -> Result<StatusCode, ApiError> {
    if let Some(token) = bearer(&headers) { s.sessions.sign_out(token).await?; }
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_bearer_token() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer(&headers), None);
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer(&headers), None);
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer  "));
        assert_eq!(bearer(&headers), None);
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer 3f2a"));
        assert_eq!(bearer(&headers), Some("3f2a"));
    }
}
