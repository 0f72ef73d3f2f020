pub mod prelude;

pub mod cards;
pub mod password_reset_tokens;
pub mod users;
pub mod work_day_edits;
