//! Form payloads and their field validators.
//!
//! Every form deserializes from `application/x-www-form-urlencoded` with all
//! fields optional, then `validate` reports problems per field so the page
//! can be rendered again with the user's input.

use regex::Regex;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::OnceLock;

use crate::db::{NewUser, ProfileUpdate, User};
use crate::domain::calendar::{WorkWindow, format_clock, parse_clock};

const USERNAME_MIN: usize = 3;
const USERNAME_MAX: usize = 25;

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("Invalid regex"))
}

/// Field name to the first message reported for it.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FormErrors(BTreeMap<&'static str, String>);

impl FormErrors {
    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.entry(field).or_insert_with(|| message.into());
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn into_result<T>(self, value: T) -> Result<T, Self> {
        if self.is_empty() { Ok(value) } else { Err(self) }
    }
}

fn check_email(errors: &mut FormErrors, email: &str) {
    let email = email.trim();
    if email.is_empty() {
        errors.add("email", "Email is required");
    } else if !email_regex().is_match(email) {
        errors.add("email", "Invalid email address");
    }
}

fn check_username(errors: &mut FormErrors, username: &str) {
    let username = username.trim();
    let len = username.chars().count();
    if len == 0 {
        errors.add("username", "Username is required");
    } else if !(USERNAME_MIN..=USERNAME_MAX).contains(&len) {
        errors.add(
            "username",
            format!("Username must be between {USERNAME_MIN} and {USERNAME_MAX} characters"),
        );
    } else if !username
        .chars()
        .all(|c| c.is_alphanumeric() || c == '_' || c == '-' || c == '.')
    {
        errors.add(
            "username",
            "Username can only contain letters, numbers, dots, hyphens, and underscores",
        );
    }
}

fn check_new_password(errors: &mut FormErrors, password: &str, confirm: &str, min_length: usize) {
    if password.is_empty() {
        errors.add("password", "Password is required");
    } else if password.chars().count() < min_length {
        errors.add(
            "password",
            format!("Password must be at least {min_length} characters"),
        );
    }

    if confirm != password {
        errors.add("confirm", "Passwords must match");
    }
}

fn parse_card_number(errors: &mut FormErrors, value: &str) -> Option<i64> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    match value.parse::<i64>() {
        Ok(number) if number > 0 => Some(number),
        _ => {
            errors.add("card_number", "Card number must be a positive number");
            None
        }
    }
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    /// Present (any value) when the checkbox is ticked
    pub remember_me: Option<String>,
}

impl LoginForm {
    #[must_use]
    pub const fn remember(&self) -> bool {
        self.remember_me.is_some()
    }

    pub fn validate(&self) -> Result<(), FormErrors> {
        let mut errors = FormErrors::default();
        check_email(&mut errors, &self.email);
        if self.password.is_empty() {
            errors.add("password", "Password is required");
        }
        errors.into_result(())
    }
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct RegistrationForm {
    pub username: String,
    pub email: String,
    pub password: String,
    pub confirm: String,
    pub card_number: String,
}

impl RegistrationForm {
    pub fn validate(&self, min_password_length: usize) -> Result<NewUser, FormErrors> {
        let mut errors = FormErrors::default();
        check_username(&mut errors, &self.username);
        check_email(&mut errors, &self.email);
        check_new_password(&mut errors, &self.password, &self.confirm, min_password_length);
        let card_number = parse_card_number(&mut errors, &self.card_number);

        errors.into_result(NewUser {
            username: self.username.trim().to_string(),
            email: self.email.trim().to_string(),
            password: self.password.clone(),
            card_number,
        })
    }
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct EmailForm {
    pub email: String,
}

impl EmailForm {
    pub fn validate(&self) -> Result<(), FormErrors> {
        let mut errors = FormErrors::default();
        check_email(&mut errors, &self.email);
        errors.into_result(())
    }
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct ResetPasswordForm {
    pub password: String,
    pub confirm: String,
}

impl ResetPasswordForm {
    pub fn validate(&self, min_password_length: usize) -> Result<(), FormErrors> {
        let mut errors = FormErrors::default();
        check_new_password(&mut errors, &self.password, &self.confirm, min_password_length);
        errors.into_result(())
    }
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct EditUserForm {
    pub username: String,
    pub email: String,
    pub card_number: String,
}

impl EditUserForm {
    #[must_use]
    pub fn from_user(user: &User) -> Self {
        Self {
            username: user.username.clone(),
            email: user.email.clone(),
            card_number: user.card_number.map(|n| n.to_string()).unwrap_or_default(),
        }
    }

    pub fn validate(&self) -> Result<ProfileUpdate, FormErrors> {
        let mut errors = FormErrors::default();
        check_username(&mut errors, &self.username);
        check_email(&mut errors, &self.email);
        let card_number = parse_card_number(&mut errors, &self.card_number);

        errors.into_result(ProfileUpdate {
            username: self.username.trim().to_string(),
            email: self.email.trim().to_string(),
            card_number,
        })
    }
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct EditDateForm {
    pub startdate: String,
    pub enddate: String,
}

impl EditDateForm {
    #[must_use]
    pub fn from_window(window: WorkWindow) -> Self {
        Self {
            startdate: format_clock(window.start),
            enddate: format_clock(window.end),
        }
    }

    pub fn validate(&self) -> Result<(), FormErrors> {
        let mut errors = FormErrors::default();
        let start = parse_clock(&self.startdate);
        let end = parse_clock(&self.enddate);

        if start.is_none() {
            errors.add("startdate", "Use the H:MM format, e.g. 8:00");
        }
        if end.is_none() {
            errors.add("enddate", "Use the H:MM format, e.g. 16:00");
        }
        if let (Some(start), Some(end)) = (start, end)
            && end <= start
        {
            errors.add("enddate", "End must be later than start");
        }

        errors.into_result(())
    }
}
