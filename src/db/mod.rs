use anyhow::Result;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use std::path::Path;
use tracing::info;

use crate::config::SecurityConfig;

pub mod migrator;
pub mod repositories;

pub use repositories::card::{DailySummaryRow, PunchMonthRow};
pub use repositories::reset_token::ResetToken;
pub use repositories::user::{NewUser, ProfileUpdate, User};
pub use repositories::work_day::WorkDayEdit;

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        // Every pooled connection to an in-memory database sees its own empty
        // database, so keep exactly one.
        let in_memory = db_url.contains(":memory:");
        let (max_connections, min_connections) = if in_memory {
            (1, 1)
        } else {
            (max_connections, min_connections)
        };

        if !in_memory {
            let path_str = db_url.trim_start_matches("sqlite:").trim_start_matches("//");
            let path_str = path_str.split('?').next().unwrap_or(path_str);
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(std::time::Duration::from_secs(10))
            .acquire_timeout(std::time::Duration::from_secs(10))
            .sqlx_logging(false);

        if !in_memory {
            opt.idle_timeout(std::time::Duration::from_secs(300))
                .max_lifetime(std::time::Duration::from_secs(600));
        }

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    fn user_repo(&self) -> repositories::user::UserRepository {
        repositories::user::UserRepository::new(self.conn.clone())
    }

    fn reset_token_repo(&self) -> repositories::reset_token::ResetTokenRepository {
        repositories::reset_token::ResetTokenRepository::new(self.conn.clone())
    }

    fn card_repo(&self) -> repositories::card::CardRepository {
        repositories::card::CardRepository::new(self.conn.clone())
    }

    fn work_day_repo(&self) -> repositories::work_day::WorkDayRepository {
        repositories::work_day::WorkDayRepository::new(self.conn.clone())
    }

    // Users

    pub async fn get_user(&self, id: i32) -> Result<Option<User>> {
        self.user_repo().get_by_id(id).await
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.user_repo().get_by_email(email).await
    }

    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        self.user_repo().get_by_username(username).await
    }

    pub async fn username_is_available(&self, username: &str) -> Result<bool> {
        self.user_repo().username_is_available(username).await
    }

    pub async fn email_is_available(&self, email: &str) -> Result<bool> {
        self.user_repo().email_is_available(email).await
    }

    pub async fn create_user(&self, new_user: NewUser, config: &SecurityConfig) -> Result<User> {
        self.user_repo().create(new_user, config).await
    }

    pub async fn verify_user_password(&self, email: &str, password: &str) -> Result<Option<User>> {
        self.user_repo().verify_password(email, password).await
    }

    pub async fn update_user_password(
        &self,
        id: i32,
        new_password: &str,
        config: &SecurityConfig,
    ) -> Result<()> {
        self.user_repo()
            .update_password(id, new_password, config)
            .await
    }

    pub async fn set_user_verified(&self, id: i32) -> Result<User> {
        self.user_repo().set_verified(id).await
    }

    pub async fn regenerate_activate_token(&self, id: i32) -> Result<User> {
        self.user_repo().regenerate_activate_token(id).await
    }

    pub async fn update_user_profile(&self, id: i32, update: ProfileUpdate) -> Result<User> {
        self.user_repo().update_profile(id, update).await
    }

    // Password reset tokens

    pub async fn get_or_create_reset_token(&self, user_id: i32, ttl: Duration) -> Result<ResetToken> {
        self.reset_token_repo().get_or_create(user_id, ttl).await
    }

    pub async fn find_valid_reset_token(
        &self,
        user_id: i32,
        value: &str,
    ) -> Result<Option<ResetToken>> {
        self.reset_token_repo().find_valid(user_id, value).await
    }

    /// Sets the password of the token's user and consumes the token, or does
    /// neither. False when the token was already used.
    pub async fn reset_password_with_token(
        &self,
        token: &ResetToken,
        new_password: &str,
        config: &SecurityConfig,
    ) -> Result<bool> {
        let password_hash = repositories::user::spawn_hash_password(new_password, config).await?;
        self.reset_token_repo().consume(token, password_hash).await
    }

    // Attendance punches

    pub async fn record_punch(&self, card_number: i64, time: NaiveDateTime) -> Result<i32> {
        Ok(self.card_repo().record(card_number, time).await?.id)
    }

    pub async fn punch_months(&self, card_number: i64) -> Result<Vec<String>> {
        self.card_repo().months(card_number).await
    }

    pub async fn daily_punch_summary(
        &self,
        card_number: i64,
        from: NaiveDate,
        until: NaiveDate,
    ) -> Result<Vec<DailySummaryRow>> {
        self.card_repo()
            .daily_summary(card_number, from, until)
            .await
    }

    pub async fn punch_slice(&self, offset: u64, limit: Option<u64>) -> Result<Vec<PunchMonthRow>> {
        self.card_repo().slice(offset, limit).await
    }

    // Work day edits

    pub async fn get_work_day_edit(
        &self,
        card_number: i64,
        day: NaiveDate,
    ) -> Result<Option<WorkDayEdit>> {
        self.work_day_repo().get(card_number, day).await
    }

    pub async fn work_day_edits(
        &self,
        card_number: i64,
        from: NaiveDate,
        until: NaiveDate,
    ) -> Result<Vec<WorkDayEdit>> {
        self.work_day_repo()
            .in_range(card_number, from, until)
            .await
    }

    pub async fn save_work_day_edit(
        &self,
        card_number: i64,
        day: NaiveDate,
        start_time: &str,
        end_time: &str,
    ) -> Result<WorkDayEdit> {
        self.work_day_repo()
            .upsert(card_number, day, start_time, end_time)
            .await
    }
}
