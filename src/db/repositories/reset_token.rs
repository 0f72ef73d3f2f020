use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait, sea_query::Expr,
};

use crate::db::repositories::user::generate_token;
use crate::entities::{password_reset_tokens, users};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResetToken {
    pub id: i32,
    pub user_id: i32,
    pub value: String,
    pub used: bool,
    pub expires_at: String,
}

impl From<password_reset_tokens::Model> for ResetToken {
    fn from(model: password_reset_tokens::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            value: model.value,
            used: model.used,
            expires_at: model.expires_at,
        }
    }
}

fn is_expired(expires_at: &str, now: DateTime<Utc>) -> bool {
    DateTime::parse_from_rfc3339(expires_at).map_or(true, |expiry| expiry <= now)
}

pub struct ResetTokenRepository {
    conn: DatabaseConnection,
}

impl ResetTokenRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Returns the newest unused, unexpired token of the user, creating one
    /// if there is none.
    pub async fn get_or_create(&self, user_id: i32, ttl: Duration) -> Result<ResetToken> {
        let now = Utc::now();

        let existing = password_reset_tokens::Entity::find()
            .filter(password_reset_tokens::Column::UserId.eq(user_id))
            .filter(password_reset_tokens::Column::Used.eq(false))
            .order_by_desc(password_reset_tokens::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to query password reset tokens")?;

        if let Some(token) = existing
            .into_iter()
            .find(|t| !is_expired(&t.expires_at, now))
        {
            return Ok(ResetToken::from(token));
        }

        let active = password_reset_tokens::ActiveModel {
            user_id: Set(user_id),
            value: Set(generate_token()),
            used: Set(false),
            created_at: Set(now.to_rfc3339()),
            expires_at: Set((now + ttl).to_rfc3339()),
            ..Default::default()
        };

        let model = active
            .insert(&self.conn)
            .await
            .context("Failed to insert password reset token")?;

        Ok(ResetToken::from(model))
    }

    /// Looks up a token that can still be used by `user_id`.
    pub async fn find_valid(&self, user_id: i32, value: &str) -> Result<Option<ResetToken>> {
        let token = password_reset_tokens::Entity::find()
            .filter(password_reset_tokens::Column::UserId.eq(user_id))
            .filter(password_reset_tokens::Column::Value.eq(value))
            .filter(password_reset_tokens::Column::Used.eq(false))
            .one(&self.conn)
            .await
            .context("Failed to query password reset token")?;

        Ok(token
            .filter(|t| !is_expired(&t.expires_at, Utc::now()))
            .map(ResetToken::from))
    }

    /// Claims the token and stores the new password hash of its user in one
    /// transaction. Returns false when the token was already consumed, so
    /// only one caller ever wins; a failed password write leaves the token
    /// unused.
    pub async fn consume(&self, token: &ResetToken, password_hash: String) -> Result<bool> {
        let txn = self
            .conn
            .begin()
            .await
            .context("Failed to start password reset transaction")?;

        let claimed = password_reset_tokens::Entity::update_many()
            .col_expr(password_reset_tokens::Column::Used, Expr::value(true))
            .filter(password_reset_tokens::Column::Id.eq(token.id))
            .filter(password_reset_tokens::Column::Used.eq(false))
            .exec(&txn)
            .await
            .context("Failed to mark password reset token used")?;

        if claimed.rows_affected != 1 {
            txn.rollback().await?;
            return Ok(false);
        }

        let updated = users::Entity::update_many()
            .col_expr(users::Column::PasswordHash, Expr::value(password_hash))
            .col_expr(
                users::Column::UpdatedAt,
                Expr::value(Utc::now().to_rfc3339()),
            )
            .filter(users::Column::Id.eq(token.user_id))
            .exec(&txn)
            .await
            .context("Failed to update password")?;

        if updated.rows_affected != 1 {
            txn.rollback().await?;
            anyhow::bail!("User not found: {}", token.user_id);
        }

        txn.commit()
            .await
            .context("Failed to commit password reset")?;

        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_expired() {
        let now = Utc::now();
        assert!(is_expired(&(now - Duration::minutes(1)).to_rfc3339(), now));
        assert!(!is_expired(&(now + Duration::minutes(1)).to_rfc3339(), now));
        assert!(is_expired("not a date", now));
    }
}
