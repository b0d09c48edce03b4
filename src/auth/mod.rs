//! Authentication
//!
//! The identity provider is an external collaborator behind
//! [`IdentityProvider`]. [`SessionHolder`] wraps it, assigns roles and falls
//! back to a local demo provider when the real one is misconfigured.
//!
//! Every sign-in issues an opaque session token. Callers present it as a
//! bearer token and only the session it names is consulted. The latest
//! session of each kind is also persisted under its well-known storage key.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{watch, RwLock};
use uuid::Uuid;
use validator::{Validate, ValidationError, ValidationErrors};
use crate::checkout::{field_errors, FieldErrors};
use crate::config::AdminCredentials;
use crate::storage::{self, keys, KeyValueStore, StorageError};

pub mod documents;
pub mod local;

pub use documents::{DocumentStore, MemoryDocumentStore, UserProfile};
pub use local::{LocalIdentityProvider, UnconfiguredIdentityProvider};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthUser {
    pub uid: String,
    pub email: String,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role { #[default] User, Admin }

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionMode {
    #[default]
    Provider,
    /// Local accounts only; nothing reaches the identity provider.
    Demo,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    #[serde(default)]
    pub token: String,
    pub uid: String,
    pub email: String,
    pub display_name: Option<String>,
    pub role: Role,
    #[serde(default)]
    pub mode: SessionMode,
}

impl Session {
    fn user(user: AuthUser, mode: SessionMode) -> Self {
        Self { token: new_token(), uid: user.uid, email: user.email, display_name: user.display_name, role: Role::User, mode }
    }

    pub fn is_admin(&self) -> bool { self.role == Role::Admin }

    /// Storage key this kind of session is persisted under.
    pub fn storage_key(&self) -> &'static str {
        match (self.role, self.mode) {
            (Role::Admin, _) => keys::ADMIN_SESSION,
            (Role::User, SessionMode::Demo) => keys::DEMO_USER,
            (Role::User, SessionMode::Provider) => keys::USER_SESSION,
        }
    }
}

fn new_token() -> String { Uuid::new_v4().simple().to_string() }

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OAuthProvider { Google, Facebook }

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_in_with_email(&self, email: &str, password: &str) -> Result<AuthUser, AuthError>;
    async fn sign_in_with_oauth(&self, provider: OAuthProvider) -> Result<AuthUser, AuthError>;
    async fn sign_up(&self, email: &str, password: &str, display_name: &str) -> Result<AuthUser, AuthError>;
    async fn send_password_reset(&self, email: &str) -> Result<(), AuthError>;
    async fn sign_out(&self) -> Result<(), AuthError>;
    /// Current-user changes, including the value at subscription time.
    fn subscribe(&self) -> watch::Receiver<Option<AuthUser>>;
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("wrong password")]
    WrongPassword,
    #[error("no account for this email")]
    UserNotFound,
    #[error("email already in use")]
    EmailInUse,
    #[error("password too weak")]
    WeakPassword,
    #[error("invalid email")]
    InvalidEmail,
    #[error("too many attempts")]
    TooManyRequests,
    #[error("sign-in popup closed")]
    PopupClosed,
    #[error("identity provider misconfigured: {0}")]
    Misconfigured(String),
    #[error("identity provider unavailable: {0}")]
    Unavailable(String),
    #[error("invalid admin credentials")]
    InvalidAdminCredentials,
    #[error("admin session required")]
    Forbidden,
    #[error("registration form has invalid fields")]
    Validation(FieldErrors),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl AuthError {
    /// Text suitable for showing next to the form that triggered the error.
    pub fn user_message(&self) -> String {
        match self {
            Self::WrongPassword | Self::UserNotFound | Self::InvalidAdminCredentials => "Incorrect email or password.".into(),
            Self::EmailInUse => "An account with this email already exists.".into(),
            Self::WeakPassword => format!("Password must be at least {} characters.", local::MIN_PASSWORD_LEN),
            Self::InvalidEmail => "Please enter a valid email address.".into(),
            Self::TooManyRequests => "Too many attempts. Please try again later.".into(),
            Self::PopupClosed => "Sign-in was cancelled.".into(),
            Self::Misconfigured(_) | Self::Unavailable(_) => "Sign-in is temporarily unavailable.".into(),
            Self::Forbidden => "You need to sign in as an administrator.".into(),
            Self::Validation(_) => "Please correct the highlighted fields.".into(),
            Self::Storage(_) => "Something went wrong. Please try again.".into(),
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationForm {
    #[validate(length(min = 2, max = 80, message = "Name must be at least 2 characters"))]
    pub name: String,
    #[validate(email(message = "Enter a valid email address"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
    pub confirm_password: String,
}

impl RegistrationForm {
    /// Copy with surrounding whitespace removed from the name and email.
    pub fn trimmed(&self) -> Self {
        Self { name: self.name.trim().to_string(), email: self.email.trim().to_string(), ..self.clone() }
    }

    /// Validates the trimmed form, so whitespace-only names are rejected.
    pub fn check(&self) -> Result<(), ValidationErrors> {
        let form = self.trimmed();
        let mut errors = match form.validate() {
            Ok(()) => ValidationErrors::new(),
            Err(errors) => errors,
        };
        if form.password != form.confirm_password {
            let mut err = ValidationError::new("must_match");
            err.message = Some("Passwords do not match".into());
            errors.add("confirm_password", err);
        }
        if errors.errors().is_empty() { Ok(()) } else { Err(errors) }
    }
}

pub struct SessionHolder {
    provider: Arc<dyn IdentityProvider>,
    demo: LocalIdentityProvider,
    documents: Arc<dyn DocumentStore>,
    kv: Arc<dyn KeyValueStore>,
    admin: AdminCredentials,
    sessions: RwLock<HashMap<String, Session>>,
}

impl std::fmt::Debug for SessionHolder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHolder").field("admin", &self.admin.email).finish_non_exhaustive()
    }
}

const SESSION_KEYS: [&str; 3] = [keys::ADMIN_SESSION, keys::USER_SESSION, keys::DEMO_USER];

impl SessionHolder {
    pub fn new(provider: Arc<dyn IdentityProvider>, documents: Arc<dyn DocumentStore>, kv: Arc<dyn KeyValueStore>, admin: AdminCredentials) -> Self {
        Self { provider, demo: LocalIdentityProvider::new(), documents, kv, admin, sessions: RwLock::default() }
    }

    /// The session `token` names, if it is still signed in.
    pub async fn current(&self, token: Option<&str>) -> Option<Session> {
        let token = token?;
        self.sessions.read().await.get(token).cloned()
    }

    pub async fn require_admin(&self, token: Option<&str>) -> Result<Session, AuthError> {
        self.current(token).await.filter(Session::is_admin).ok_or(AuthError::Forbidden)
    }

    /// Picks up the sessions persisted by an earlier run. Records written
    /// before tokens existed are given one and written back.
    pub async fn restore(&self) -> Result<Vec<Session>, AuthError> {
        let mut restored = Vec::new();
        for key in SESSION_KEYS {
            let Some(mut session) = storage::read_json::<Session>(self.kv.as_ref(), key).await? else { continue };
            if session.token.is_empty() {
                session.token = new_token();
                storage::write_json(self.kv.as_ref(), key, &session).await?;
            }
            tracing::info!(key, uid = %session.uid, "restored session");
            self.sessions.write().await.insert(session.token.clone(), session.clone());
            restored.push(session);
        }
        Ok(restored)
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let (user, mode) = match self.provider.sign_in_with_email(email, password).await {
            Err(AuthError::Misconfigured(reason)) => {
                tracing::warn!(%reason, "identity provider misconfigured, using demo accounts");
                (self.demo.sign_in_with_email(email, password).await?, SessionMode::Demo)
            }
            other => (other?, SessionMode::Provider),
        };
        self.establish(Session::user(user, mode)).await
    }

    pub async fn sign_in_with_oauth(&self, provider: OAuthProvider) -> Result<Session, AuthError> {
        let user = self.provider.sign_in_with_oauth(provider).await?;
        self.establish(Session::user(user, SessionMode::Provider)).await
    }

    /// The admin login path; the only way to obtain [`Role::Admin`].
    pub async fn sign_in_admin(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        if !email.trim().eq_ignore_ascii_case(&self.admin.email) || password != self.admin.password {
            return Err(AuthError::InvalidAdminCredentials);
        }
        let session = Session {
            token: new_token(), uid: "admin".into(), email: self.admin.email.clone(),
            display_name: Some("Administrator".into()), role: Role::Admin, mode: SessionMode::Provider,
        };
        self.establish(session).await
    }

    pub async fn register(&self, form: &RegistrationForm) -> Result<Session, AuthError> {
        form.check().map_err(|e| AuthError::Validation(field_errors(&e)))?;
        let form = form.trimmed();
        let (user, mode) = match self.provider.sign_up(&form.email, &form.password, &form.name).await {
            Err(AuthError::Misconfigured(reason)) => {
                tracing::warn!(%reason, "identity provider misconfigured, registering a demo account");
                (self.demo.sign_up(&form.email, &form.password, &form.name).await?, SessionMode::Demo)
            }
            other => (other?, SessionMode::Provider),
        };
        let profile = UserProfile::new(user.uid.clone(), form.name.as_str(), user.email.clone());
        let fields = serde_json::to_value(&profile).map_err(StorageError::from)?;
        self.documents.set_document(documents::USERS, &user.uid, fields).await?;
        self.establish(Session::user(user, mode)).await
    }

    pub async fn send_password_reset(&self, email: &str) -> Result<(), AuthError> {
        match self.provider.send_password_reset(email).await {
            Err(AuthError::Misconfigured(_)) => self.demo.send_password_reset(email).await,
            other => other,
        }
    }

    /// Ends the session `token` names. The in-memory session is dropped only
    /// after the persisted record and the provider sign-out succeed.
    pub async fn sign_out(&self, token: &str) -> Result<(), AuthError> {
        let Some(session) = self.current(Some(token)).await else { return Ok(()) };
        let key = session.storage_key();
        let persisted = storage::read_json::<Session>(self.kv.as_ref(), key).await?;
        if persisted.is_some_and(|p| p.token == session.token) { self.kv.remove(key).await?; }
        match (session.role, session.mode) {
            (Role::Admin, _) => {}
            (Role::User, SessionMode::Demo) => self.demo.sign_out().await?,
            (Role::User, SessionMode::Provider) => self.provider.sign_out().await?,
        }
        self.sessions.write().await.remove(token);
        tracing::info!(uid = %session.uid, "signed out");
        Ok(())
    }

    async fn establish(&self, session: Session) -> Result<Session, AuthError> {
        storage::write_json(self.kv.as_ref(), session.storage_key(), &session).await?;
        tracing::info!(uid = %session.uid, role = ?session.role, mode = ?session.mode, "session established");
        self.sessions.write().await.insert(session.token.clone(), session.clone());
        Ok(session)
    }
}
