//! `SeaORM` implementation of the `AuthService` trait.

use std::sync::Arc;

use crate::config::SecurityConfig;
use crate::db::{NewUser, ProfileUpdate, ResetToken, Store, User};
use crate::services::auth_service::{ActivationOutcome, AuthError, AuthService, ResendOutcome};
use crate::services::mail::{MailComposer, Mailer, OutgoingMail};
use async_trait::async_trait;

pub struct SeaOrmAuthService {
    store: Store,
    mailer: Arc<dyn Mailer>,
    composer: MailComposer,
    security: SecurityConfig,
}

impl SeaOrmAuthService {
    #[must_use]
    pub fn new(
        store: Store,
        mailer: Arc<dyn Mailer>,
        composer: MailComposer,
        security: SecurityConfig,
    ) -> Self {
        Self {
            store,
            mailer,
            composer,
            security,
        }
    }

    /// Delivery problems are logged, never surfaced to the caller.
    async fn deliver(&self, mail: anyhow::Result<OutgoingMail>) {
        let mail = match mail {
            Ok(mail) => mail,
            Err(e) => {
                tracing::error!(error = %e, "Failed to compose mail");
                return;
            }
        };

        let to = mail.to.clone();
        if let Err(e) = self.mailer.send(mail).await {
            tracing::error!(error = %e, to = %to, "Failed to send mail");
        }
    }

    fn check_password(&self, password: &str) -> Result<(), AuthError> {
        if password.chars().count() < self.security.min_password_length {
            return Err(AuthError::Validation(format!(
                "Password must be at least {} characters",
                self.security.min_password_length
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl AuthService for SeaOrmAuthService {
    async fn register(&self, new_user: NewUser) -> Result<User, AuthError> {
        self.check_password(&new_user.password)?;

        if !self.store.username_is_available(&new_user.username).await? {
            return Err(AuthError::UsernameTaken);
        }
        if !self.store.email_is_available(&new_user.email).await? {
            return Err(AuthError::EmailTaken);
        }

        let user = self.store.create_user(new_user, &self.security).await?;
        metrics::counter!("auth_registrations_total").increment(1);
        tracing::info!(user_id = user.id, username = %user.username, "User registered");

        self.deliver(self.composer.activation(&user)).await;

        Ok(user)
    }

    async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let user = self.store.verify_user_password(email, password).await?;

        if let Some(user) = user {
            metrics::counter!("auth_logins_total", "outcome" => "success").increment(1);
            Ok(user)
        } else {
            metrics::counter!("auth_logins_total", "outcome" => "failure").increment(1);
            Err(AuthError::InvalidCredentials)
        }
    }

    async fn get_user(&self, id: i32) -> Result<Option<User>, AuthError> {
        Ok(self.store.get_user(id).await?)
    }

    async fn activate(
        &self,
        user_id: Option<i32>,
        token: Option<&str>,
    ) -> Result<ActivationOutcome, AuthError> {
        let user = match user_id {
            Some(id) => self.store.get_user(id).await?,
            None => None,
        };
        let Some(user) = user else {
            return Err(AuthError::InvalidActivation);
        };

        if user.is_verified() {
            return Ok(ActivationOutcome::AlreadyVerified);
        }

        if token != Some(user.activate_token.as_str()) {
            return Err(AuthError::InvalidActivation);
        }

        self.store.set_user_verified(user.id).await?;
        tracing::info!(user_id = user.id, "Account activated");

        Ok(ActivationOutcome::Activated)
    }

    async fn resend_activation(&self, user_id: i32) -> Result<ResendOutcome, AuthError> {
        let user = self
            .store
            .get_user(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        if user.is_verified() {
            return Ok(ResendOutcome::AlreadyVerified);
        }

        let user = self.store.regenerate_activate_token(user.id).await?;
        self.deliver(self.composer.activation(&user)).await;

        Ok(ResendOutcome::Sent)
    }

    async fn request_password_reset(&self, email: &str) -> Result<User, AuthError> {
        let user = self
            .store
            .get_user_by_email(email)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        let ttl = chrono::Duration::hours(self.security.reset_token_ttl_hours);
        let token = self.store.get_or_create_reset_token(user.id, ttl).await?;

        self.deliver(self.composer.password_reset(&user, &token.value))
            .await;
        tracing::info!(user_id = user.id, "Password reset requested");

        Ok(user)
    }

    async fn check_reset_token(&self, user_id: i32, token: &str) -> Result<ResetToken, AuthError> {
        self.store
            .find_valid_reset_token(user_id, token)
            .await?
            .ok_or(AuthError::InvalidResetToken)
    }

    async fn reset_password(
        &self,
        token: &ResetToken,
        new_password: &str,
    ) -> Result<(), AuthError> {
        self.check_password(new_password)?;

        if !self
            .store
            .reset_password_with_token(token, new_password, &self.security)
            .await?
        {
            return Err(AuthError::InvalidResetToken);
        }
        tracing::info!(user_id = token.user_id, "Password reset completed");

        Ok(())
    }

    async fn update_account(
        &self,
        user_id: i32,
        update: ProfileUpdate,
    ) -> Result<User, AuthError> {
        let current = self
            .store
            .get_user(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        if update.username.trim() != current.username
            && !self.store.username_is_available(&update.username).await?
        {
            return Err(AuthError::UsernameTaken);
        }

        if crate::db::repositories::user::normalize_email(&update.email) != current.email
            && !self.store.email_is_available(&update.email).await?
        {
            return Err(AuthError::EmailTaken);
        }

        Ok(self.store.update_user_profile(user_id, update).await?)
    }
}
