//! Domain service for authentication and user management.
//!
//! Handles registration, login, email verification, password reset and
//! account edits.

use thiserror::Error;

use crate::db::{NewUser, ProfileUpdate, ResetToken, User};

/// Errors specific to authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid email/password combination")]
    InvalidCredentials,

    #[error("User not found")]
    UserNotFound,

    #[error("Username is already taken")]
    UsernameTaken,

    #[error("Email is already registered")]
    EmailTaken,

    #[error("Invalid userid/token combination")]
    InvalidActivation,

    #[error("Invalid or expired password reset link")]
    InvalidResetToken,

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for AuthError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(format!("{err:#}"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationOutcome {
    Activated,
    AlreadyVerified,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResendOutcome {
    Sent,
    AlreadyVerified,
}

/// Domain service trait for authentication.
#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    /// Creates an unverified account and sends the activation email.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::UsernameTaken`] or [`AuthError::EmailTaken`] when
    /// either value is already in use.
    async fn register(&self, new_user: NewUser) -> Result<User, AuthError>;

    /// Verifies credentials and returns the user.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] if login fails.
    async fn login(&self, email: &str, password: &str) -> Result<User, AuthError>;

    async fn get_user(&self, id: i32) -> Result<Option<User>, AuthError>;

    /// Confirms an email address. Activating an already verified account
    /// changes nothing.
    async fn activate(
        &self,
        user_id: Option<i32>,
        token: Option<&str>,
    ) -> Result<ActivationOutcome, AuthError>;

    /// Issues a fresh activation token and mails it, unless already verified.
    async fn resend_activation(&self, user_id: i32) -> Result<ResendOutcome, AuthError>;

    /// Mails a password reset link to the owner of `email`.
    async fn request_password_reset(&self, email: &str) -> Result<User, AuthError>;

    /// Checks that a reset link is still usable.
    async fn check_reset_token(&self, user_id: i32, token: &str) -> Result<ResetToken, AuthError>;

    /// Consumes the token and sets the new password.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidResetToken`] when the token has already
    /// been used.
    async fn reset_password(&self, token: &ResetToken, new_password: &str)
    -> Result<(), AuthError>;

    /// Saves the account page, rejecting a username or email owned by
    /// someone else.
    async fn update_account(&self, user_id: i32, update: ProfileUpdate)
    -> Result<User, AuthError>;
}
