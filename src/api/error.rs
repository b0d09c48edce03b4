use axum::{http::StatusCode, response::{IntoResponse, Response}, Json};
use serde::Serialize;
use thiserror::Error;
use crate::admin::AdminError;
use crate::auth::AuthError;
use crate::checkout::{CheckoutError, FieldErrors, PERSISTENCE_FAILED};
use crate::domain::{value_objects::ProductIdError, CartError};
use crate::orders::OrderStoreError;
use crate::storage::StorageError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Please correct the highlighted fields.")]
    Validation(FieldErrors),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    TooManyRequests(String),
    #[error("{0}")]
    Unavailable(String),
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    fields: Option<&'a FieldErrors>,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::TooManyRequests(_) => StatusCode::TOO_MANY_REQUESTS,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let fields = match &self { Self::Validation(fields) => Some(fields), _ => None };
        let body = ErrorBody { error: self.to_string(), fields };
        (self.status(), Json(body)).into_response()
    }
}

impl From<StorageError> for ApiError {
    fn from(error: StorageError) -> Self {
        tracing::error!(%error, "storage failure");
        Self::Unavailable("Storage is temporarily unavailable. Please try again.".into())
    }
}

impl From<ProductIdError> for ApiError {
    fn from(error: ProductIdError) -> Self { Self::BadRequest(error.to_string()) }
}

impl From<CartError> for ApiError {
    fn from(error: CartError) -> Self {
        match error {
            CartError::ItemNotFound(_) => Self::NotFound(error.to_string()),
            _ => Self::BadRequest(error.to_string()),
        }
    }
}

impl From<CheckoutError> for ApiError {
    fn from(error: CheckoutError) -> Self {
        match error {
            CheckoutError::Validation(fields) => Self::Validation(fields),
            CheckoutError::EmptyCart => Self::BadRequest("Your cart is empty.".into()),
            CheckoutError::AlreadyConfirmed => Self::Conflict(error.to_string()),
            CheckoutError::Order(e) => Self::BadRequest(e.to_string()),
            CheckoutError::Persistence(e) => {
                tracing::error!(error = %e, "checkout persistence failure");
                Self::Unavailable(PERSISTENCE_FAILED.into())
            }
        }
    }
}

impl From<OrderStoreError> for ApiError {
    fn from(error: OrderStoreError) -> Self {
        match error {
            OrderStoreError::NotFound(_) => Self::NotFound(error.to_string()),
            OrderStoreError::Order(e) => Self::Conflict(e.to_string()),
            OrderStoreError::Storage(e) => e.into(),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(error: AuthError) -> Self {
        let message = error.user_message();
        match error {
            AuthError::Validation(fields) => Self::Validation(fields),
            AuthError::WrongPassword | AuthError::UserNotFound | AuthError::InvalidAdminCredentials => Self::Unauthorized(message),
            AuthError::EmailInUse => Self::Conflict(message),
            AuthError::WeakPassword | AuthError::InvalidEmail | AuthError::PopupClosed => Self::BadRequest(message),
            AuthError::TooManyRequests => Self::TooManyRequests(message),
            AuthError::Forbidden => Self::Forbidden(message),
            AuthError::Misconfigured(reason) | AuthError::Unavailable(reason) => {
                tracing::warn!(%reason, "identity provider failure");
                Self::Unavailable(message)
            }
            AuthError::Storage(e) => e.into(),
        }
    }
}

impl From<AdminError> for ApiError {
    fn from(error: AdminError) -> Self {
        match error {
            AdminError::Validation(fields) => Self::Validation(fields),
            AdminError::ProductNotFound(_) => Self::NotFound(error.to_string()),
            AdminError::Orders(e) => e.into(),
            AdminError::Storage(e) => e.into(),
        }
    }
}
