pub use super::cards::Entity as Cards;
pub use super::password_reset_tokens::Entity as PasswordResetTokens;
pub use super::users::Entity as Users;
pub use super::work_day_edits::Entity as WorkDayEdits;
