//! Local demo identity provider
//!
//! Accounts live in memory for the life of the process. Used when no
//! external identity provider is configured, or when the configured one
//! reports itself misconfigured during registration.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::{watch, RwLock};
use uuid::Uuid;
use crate::auth::{AuthError, AuthUser, IdentityProvider, OAuthProvider};

pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug)]
struct LocalAccount { user: AuthUser, password: String }

#[derive(Debug)]
pub struct LocalIdentityProvider {
    accounts: RwLock<HashMap<String, LocalAccount>>,
    current: watch::Sender<Option<AuthUser>>,
}

impl Default for LocalIdentityProvider {
    fn default() -> Self {
        let (current, _) = watch::channel(None);
        Self { accounts: RwLock::new(HashMap::new()), current }
    }
}

impl LocalIdentityProvider {
    pub fn new() -> Self { Self::default() }
}

fn normalize(email: &str) -> String { email.trim().to_lowercase() }

#[async_trait]
impl IdentityProvider for LocalIdentityProvider {
    async fn sign_in_with_email(&self, email: &str, password: &str) -> Result<AuthUser, AuthError> {
        let accounts = self.accounts.read().await;
        let account = accounts.get(&normalize(email)).ok_or(AuthError::UserNotFound)?;
        if account.password != password { return Err(AuthError::WrongPassword); }
        self.current.send_replace(Some(account.user.clone()));
        Ok(account.user.clone())
    }

    async fn sign_in_with_oauth(&self, provider: OAuthProvider) -> Result<AuthUser, AuthError> {
        Err(AuthError::Unavailable(format!("{provider:?} sign-in is not available in demo mode")))
    }

    async fn sign_up(&self, email: &str, password: &str, display_name: &str) -> Result<AuthUser, AuthError> {
        if password.len() < MIN_PASSWORD_LEN { return Err(AuthError::WeakPassword); }
        let key = normalize(email);
        if !key.contains('@') { return Err(AuthError::InvalidEmail); }
        let mut accounts = self.accounts.write().await;
        if accounts.contains_key(&key) { return Err(AuthError::EmailInUse); }
        let user = AuthUser {
            uid: format!("demo-{}", Uuid::new_v4().simple()),
            email: key.clone(),
            display_name: Some(display_name.trim().to_string()).filter(|n| !n.is_empty()),
            photo_url: None,
        };
        accounts.insert(key, LocalAccount { user: user.clone(), password: password.to_string() });
        self.current.send_replace(Some(user.clone()));
        Ok(user)
    }

    async fn send_password_reset(&self, email: &str) -> Result<(), AuthError> {
        if !self.accounts.read().await.contains_key(&normalize(email)) { return Err(AuthError::UserNotFound); }
        tracing::info!(email, "demo mode: password reset requested, no email sent");
        Ok(())
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        self.current.send_replace(None);
        Ok(())
    }

    fn subscribe(&self) -> watch::Receiver<Option<AuthUser>> { self.current.subscribe() }
}

/// Stand-in for an identity provider whose credentials are missing.
#[derive(Debug)]
pub struct UnconfiguredIdentityProvider {
    current: watch::Sender<Option<AuthUser>>,
}

impl Default for UnconfiguredIdentityProvider {
    fn default() -> Self { Self { current: watch::channel(None).0 } }
}

impl UnconfiguredIdentityProvider {
    pub fn new() -> Self { Self::default() }

    fn error() -> AuthError { AuthError::Misconfigured("no identity provider is configured".into()) }
}

#[async_trait]
impl IdentityProvider for UnconfiguredIdentityProvider {
    async fn sign_in_with_email(&self, _: &str, _: &str) -> Result<AuthUser, AuthError> { Err(Self::error()) }
    async fn sign_in_with_oauth(&self, _: OAuthProvider) -> Result<AuthUser, AuthError> { Err(Self::error()) }
    async fn sign_up(&self, _: &str, _: &str, _: &str) -> Result<AuthUser, AuthError> { Err(Self::error()) }
    async fn send_password_reset(&self, _: &str) -> Result<(), AuthError> { Err(Self::error()) }
    async fn sign_out(&self) -> Result<(), AuthError> { Ok(()) }

    fn subscribe(&self) -> watch::Receiver<Option<AuthUser>> { self.current.subscribe() }
}
