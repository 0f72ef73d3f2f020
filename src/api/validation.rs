use chrono::NaiveDate;

use super::ApiError;

pub fn validate_card_number(card_number: i64) -> Result<i64, ApiError> {
    if card_number <= 0 {
        return Err(ApiError::validation(format!(
            "Invalid card number: {card_number}. Card number must be a positive integer"
        )));
    }
    Ok(card_number)
}

pub fn validate_month(year: i32, month: u32) -> Result<(i32, u32), ApiError> {
    const MIN_YEAR: i32 = 1970;
    const MAX_YEAR: i32 = 9999;

    if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
        return Err(ApiError::validation(format!(
            "Invalid year: {year}. Year must be between {MIN_YEAR} and {MAX_YEAR}"
        )));
    }
    if !(1..=12).contains(&month) {
        return Err(ApiError::validation(format!(
            "Invalid month: {month}. Month must be between 1 and 12"
        )));
    }
    Ok((year, month))
}

pub fn validate_day(year: i32, month: u32, day: u32) -> Result<NaiveDate, ApiError> {
    let (year, month) = validate_month(year, month)?;
    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| {
        ApiError::validation(format!(
            "Invalid day: {day}. {year}-{month:02} has no such day"
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_card_number() {
        assert!(validate_card_number(1).is_ok());
        assert!(validate_card_number(0).is_err());
        assert!(validate_card_number(-7).is_err());
    }

    #[test]
    fn test_validate_month() {
        assert!(validate_month(2024, 1).is_ok());
        assert!(validate_month(2024, 12).is_ok());
        assert!(validate_month(2024, 0).is_err());
        assert!(validate_month(2024, 13).is_err());
        assert!(validate_month(1900, 5).is_err());
    }

    #[test]
    fn test_validate_day() {
        assert!(validate_day(2024, 2, 29).is_ok());
        assert!(validate_day(2023, 2, 29).is_err());
        assert!(validate_day(2024, 4, 31).is_err());
        assert!(validate_day(2024, 4, 0).is_err());
    }
}
