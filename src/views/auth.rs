use super::{PageContext, checkbox, form, input, layout};
use crate::api::forms::{EditUserForm, EmailForm, FormErrors, LoginForm, RegistrationForm};

/// Appends `?next=...` to a form action when there is somewhere to go back to.
fn with_next(action: &str, next: Option<&str>) -> String {
    match next {
        Some(next) => format!("{action}?next={}", urlencoding::encode(next)),
        None => action.to_string(),
    }
}

#[must_use]
pub fn login_page(
    ctx: &PageContext,
    data: &LoginForm,
    errors: &FormErrors,
    next: Option<&str>,
) -> String {
    let fields = [
        input("Email", "email", "email", &data.email, errors.get("email")),
        input("Password", "password", "password", "", errors.get("password")),
        checkbox("Remember me", "remember_me", data.remember()),
    ]
    .concat();

    let body = format!(
        r#"{}<p><a href="/forgot_password">Forgot your password?</a></p><p>No account yet? <a href="/register">Register</a></p>"#,
        form(&with_next("/login", next), &fields, "Log in")
    );

    layout("Log in", ctx, &body)
}

#[must_use]
pub fn register_page(ctx: &PageContext, data: &RegistrationForm, errors: &FormErrors) -> String {
    let fields = [
        input(
            "Username",
            "username",
            "text",
            &data.username,
            errors.get("username"),
        ),
        input("Email", "email", "email", &data.email, errors.get("email")),
        input(
            "Card number",
            "card_number",
            "text",
            &data.card_number,
            errors.get("card_number"),
        ),
        input("Password", "password", "password", "", errors.get("password")),
        input(
            "Verify password",
            "confirm",
            "password",
            "",
            errors.get("confirm"),
        ),
    ]
    .concat();

    layout("Register", ctx, &form("/register", &fields, "Register"))
}

#[must_use]
pub fn forgot_password_page(ctx: &PageContext, data: &EmailForm, errors: &FormErrors) -> String {
    let body = format!(
        "<p>Enter the email you registered with and we will send you a reset link.</p>{}",
        form(
            "/forgot_password",
            &input("Email", "email", "email", &data.email, errors.get("email")),
            "Send reset link",
        )
    );

    layout("Forgot password", ctx, &body)
}

/// The form posts back to the same `userid`/`token` URL so the guard sees
/// them again.
#[must_use]
pub fn reset_password_page(
    ctx: &PageContext,
    user_id: i32,
    token: &str,
    errors: &FormErrors,
) -> String {
    let action = format!(
        "/reset_password?userid={user_id}&token={}",
        urlencoding::encode(token)
    );
    let fields = [
        input(
            "New password",
            "password",
            "password",
            "",
            errors.get("password"),
        ),
        input(
            "Verify password",
            "confirm",
            "password",
            "",
            errors.get("confirm"),
        ),
    ]
    .concat();

    layout("Reset password", ctx, &form(&action, &fields, "Reset password"))
}

#[must_use]
pub fn account_page(
    ctx: &PageContext,
    data: &EditUserForm,
    errors: &FormErrors,
    next: Option<&str>,
) -> String {
    let fields = [
        input(
            "Username",
            "username",
            "text",
            &data.username,
            errors.get("username"),
        ),
        input("Email", "email", "email", &data.email, errors.get("email")),
        input(
            "Card number",
            "card_number",
            "text",
            &data.card_number,
            errors.get("card_number"),
        ),
    ]
    .concat();

    let verified = match &ctx.user {
        Some(user) if !user.is_verified() => {
            r#"<p>Your email is not verified. <a href="/resend_activation_email">Resend the activation email</a></p>"#
        }
        _ => "",
    };

    let body = format!(
        "{verified}{}",
        form(&with_next("/account", next), &fields, "Save")
    );

    layout("Account", ctx, &body)
}
