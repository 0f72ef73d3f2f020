use anyhow::Context;
use chrono::{Local, NaiveDateTime};

use crate::config::Config;
use crate::db::Store;
use crate::services::{AttendanceService, SeaOrmAttendanceService};

/// Accepts `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DD HH:MM` and the `T` separated
/// forms of both.
pub fn parse_punch_time(value: &str) -> Option<NaiveDateTime> {
    const FORMATS: [&str; 4] = [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M",
    ];

    let value = value.trim();
    FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
}

pub async fn cmd_punch(config: &Config, card_number: i64, at: Option<&str>) -> anyhow::Result<()> {
    if card_number <= 0 {
        anyhow::bail!("Card number must be a positive number");
    }

    let time = match at {
        Some(value) => parse_punch_time(value)
            .with_context(|| format!("Invalid time '{value}', expected YYYY-MM-DD HH:MM[:SS]"))?,
        None => Local::now().naive_local(),
    };

    let store = Store::with_pool_options(
        &config.general.database_path,
        config.general.max_db_connections,
        config.general.min_db_connections,
    )
    .await?;
    let attendance = SeaOrmAttendanceService::new(store, &config.attendance)?;

    let id = attendance.record_punch(card_number, time).await?;
    println!("✓ Recorded punch #{id} for card {card_number} at {time}");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_punch_time() {
        let expected = chrono::NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(8, 5, 0)
            .unwrap();
        assert_eq!(parse_punch_time("2024-03-01 08:05"), Some(expected));
        assert_eq!(parse_punch_time("2024-03-01T08:05:00"), Some(expected));
        assert_eq!(parse_punch_time(" 2024-03-01 08:05:00 "), Some(expected));
        assert_eq!(parse_punch_time("yesterday"), None);
    }
}
