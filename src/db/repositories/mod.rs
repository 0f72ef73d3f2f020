pub mod card;
pub mod reset_token;
pub mod user;
pub mod work_day;
