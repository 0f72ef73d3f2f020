//! One-shot notifications carried in the session until the next rendered page.

use axum::response::{IntoResponse, Redirect, Response};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use super::ApiError;
use super::observability::note_flash;

const FLASH_KEY: &str = "_flashes";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashCategory {
    Info,
    Warning,
    Danger,
}

impl FlashCategory {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Danger => "danger",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub category: FlashCategory,
    pub message: String,
}

impl Flash {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            category: FlashCategory::Info,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            category: FlashCategory::Warning,
            message: message.into(),
        }
    }

    pub fn danger(message: impl Into<String>) -> Self {
        Self {
            category: FlashCategory::Danger,
            message: message.into(),
        }
    }
}

pub async fn push(session: &Session, flash: Flash) -> Result<(), ApiError> {
    let mut flashes: Vec<Flash> = session.get(FLASH_KEY).await?.unwrap_or_default();
    flashes.push(flash);
    session.insert(FLASH_KEY, flashes).await?;
    Ok(())
}

/// Removes and returns every pending flash.
pub async fn take(session: &Session) -> Result<Vec<Flash>, ApiError> {
    Ok(session
        .remove::<Vec<Flash>>(FLASH_KEY)
        .await?
        .unwrap_or_default())
}

/// Queues `flash` and redirects to `to` with 303.
pub async fn redirect(session: &Session, flash: Flash, to: &str) -> Result<Response, ApiError> {
    let category = flash.category;
    push(session, flash).await?;

    let mut response = Redirect::to(to).into_response();
    note_flash(&mut response, category);
    Ok(response)
}
