pub mod attendance_service;
pub use attendance_service::{AttendanceError, AttendanceService, MonthlyReport};

pub mod attendance_service_impl;
pub use attendance_service_impl::SeaOrmAttendanceService;

pub mod auth_service;
pub use auth_service::{ActivationOutcome, AuthError, AuthService, ResendOutcome};

pub mod auth_service_impl;
pub use auth_service_impl::SeaOrmAuthService;

pub mod mail;
pub use mail::{LogMailer, MailComposer, Mailer, MemoryMailer, OutgoingMail};
