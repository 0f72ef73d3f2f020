//! Server-side HTML rendering.
//!
//! Pages are plain strings built around one shared layout. Every piece of
//! user-controlled text goes through [`text`] or [`attr`].

use axum::http::StatusCode;
use std::borrow::Cow;
use std::fmt::Write as _;

use crate::api::flash::Flash;
use crate::db::User;

pub mod auth;
pub mod reports;

/// What the layout needs besides the page body.
#[derive(Debug, Default, Clone)]
pub struct PageContext {
    pub user: Option<User>,
    pub flashes: Vec<Flash>,
}

impl PageContext {
    #[must_use]
    pub const fn new(user: Option<User>, flashes: Vec<Flash>) -> Self {
        Self { user, flashes }
    }
}

/// Escapes text content.
pub fn text(value: &str) -> Cow<'_, str> {
    html_escape::encode_text(value)
}

/// Escapes a value placed inside a double-quoted attribute.
pub fn attr(value: &str) -> Cow<'_, str> {
    html_escape::encode_double_quoted_attribute(value)
}

fn nav(user: Option<&User>) -> String {
    let mut out = String::from(r#"<nav><a href="/">Docházka</a>"#);

    match user {
        Some(user) => {
            out.push_str(r#" <a href="/vypisy">Výpisy</a> <a href="/tabletest">Table</a>"#);
            let _ = write!(
                out,
                r#" <span class="user">{}</span> <a href="/account">Account</a> <a href="/logout">Log out</a>"#,
                text(&user.username)
            );
        }
        None => {
            out.push_str(r#" <a href="/login">Log in</a> <a href="/register">Register</a>"#);
        }
    }

    out.push_str("</nav>");
    out
}

fn flashes(flashes: &[Flash]) -> String {
    let mut out = String::new();
    for flash in flashes {
        let _ = write!(
            out,
            r#"<div class="alert alert-{}">{}</div>"#,
            flash.category.as_str(),
            text(&flash.message)
        );
    }
    out
}

/// Wraps `body` in the site layout.
#[must_use]
pub fn layout(title: &str, ctx: &PageContext, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="cs">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title} | Docházka</title>
<style>
body {{ font-family: sans-serif; margin: 2em; }}
nav a, nav span {{ margin-right: 1em; }}
.alert {{ padding: .5em 1em; margin: .5em 0; border-radius: 4px; }}
.alert-info {{ background: #d9edf7; }}
.alert-warning {{ background: #fcf8e3; }}
.alert-danger {{ background: #f2dede; }}
.error {{ color: #a94442; }}
table {{ border-collapse: collapse; }}
td, th {{ border: 1px solid #ccc; padding: .25em .5em; }}
tr.weekend {{ background: #eee; }}
</style>
</head>
<body>
{nav}
{flashes}
<main>
<h1>{title}</h1>
{body}
</main>
</body>
</html>
"#,
        title = text(title),
        nav = nav(ctx.user.as_ref()),
        flashes = flashes(&ctx.flashes),
    )
}

/// Standalone page for errors; no session is available at that point.
#[must_use]
pub fn error_page(status: StatusCode, message: &str) -> String {
    let title = status.canonical_reason().unwrap_or("Error");
    let body = format!(
        r#"<p class="error">{}</p><p><a href="/">Back to the start page</a></p>"#,
        text(message)
    );
    layout(title, &PageContext::default(), &body)
}

/// A labelled `<input>` with its validation message underneath.
#[must_use]
pub fn input(label: &str, name: &str, kind: &str, value: &str, error: Option<&str>) -> String {
    let mut out = format!(
        r#"<p><label for="{name}">{label}</label><br><input id="{name}" name="{name}" type="{kind}""#,
        name = attr(name),
        label = text(label),
        kind = attr(kind),
    );

    // Never echo passwords back.
    if kind != "password" {
        let _ = write!(out, r#" value="{}""#, attr(value));
    }
    out.push('>');

    if let Some(error) = error {
        let _ = write!(out, r#"<br><span class="error">{}</span>"#, text(error));
    }

    out.push_str("</p>");
    out
}

/// A checkbox that posts `value="y"` when ticked.
#[must_use]
pub fn checkbox(label: &str, name: &str, checked: bool) -> String {
    format!(
        r#"<p><label><input name="{name}" type="checkbox" value="y"{checked}> {label}</label></p>"#,
        name = attr(name),
        label = text(label),
        checked = if checked { " checked" } else { "" },
    )
}

/// POST form around already rendered fields.
#[must_use]
pub fn form(action: &str, fields: &str, submit: &str) -> String {
    format!(
        r#"<form method="post" action="{action}">{fields}<p><button type="submit">{submit}</button></p></form>"#,
        action = attr(action),
        submit = text(submit),
    )
}

/// Start page.
#[must_use]
pub fn index_page(ctx: &PageContext) -> String {
    let body = match &ctx.user {
        Some(user) if !user.is_verified() => format!(
            r#"<p>Welcome back, {}.</p><p>Your email address is not verified yet. <a href="/resend_activation_email">Send the activation email again</a>.</p>"#,
            text(&user.username)
        ),
        Some(user) => match user.card_number {
            Some(card) => format!(
                r#"<p>Welcome back, {}.</p><p>Card number {card}. See your <a href="/vypisy">monthly reports</a>.</p>"#,
                text(&user.username)
            ),
            None => format!(
                r#"<p>Welcome back, {}.</p><p>No card number is set. <a href="/account">Add it on your account page</a>.</p>"#,
                text(&user.username)
            ),
        },
        None => r#"<p>Attendance records. <a href="/login">Log in</a> or <a href="/register">create an account</a>.</p>"#
            .to_string(),
    };

    layout("Docházka", ctx, &body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_and_attr_escape_markup() {
        assert_eq!(text("<b>&</b>"), "&lt;b&gt;&amp;&lt;/b&gt;");
        assert_eq!(attr(r#"a"b"#), "a&quot;b");
    }

    #[test]
    fn test_layout_renders_flashes_escaped() {
        let ctx = PageContext::new(None, vec![Flash::warning("<script>x</script>")]);
        let html = layout("Test", &ctx, "<p>body</p>");

        assert!(html.contains(r#"class="alert alert-warning""#));
        assert!(html.contains("&lt;script&gt;x&lt;/script&gt;"));
        assert!(!html.contains("<script>x"));
        assert!(html.contains(r#"href="/login""#));
    }

    #[test]
    fn test_password_input_never_echoes_value() {
        let html = input("Password", "password", "password", "hunter2", None);
        assert!(!html.contains("hunter2"));

        let html = input("Email", "email", "email", "a@b.cz", Some("Invalid email address"));
        assert!(html.contains(r#"value="a@b.cz""#));
        assert!(html.contains("Invalid email address"));
    }

    #[test]
    fn test_error_page_uses_status_reason() {
        let html = error_page(StatusCode::NOT_FOUND, "User 5 not found");
        assert!(html.contains("Not Found"));
        assert!(html.contains("User 5 not found"));
    }
}
