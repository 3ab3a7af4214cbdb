//! Server-rendered HTML pages.

use axum::response::Html;
use html_escape::{encode_double_quoted_attribute as attr, encode_text as text};
use serde_json::Value;
use std::fmt::Write;

use super::flash::Flash;
use crate::db::{Page, User};

/// Chrome shared by every page.
pub struct Layout<'a> {
    pub title: &'a str,
    pub user: Option<&'a User>,
    pub flashes: &'a [Flash],
}

impl Layout<'_> {
    fn render(&self, body: &str) -> Html<String> {
        let mut nav = String::from(
            r#"<a href="/">Search</a> <a href="/weather">Weather</a> <a href="/about">About</a>"#,
        );
        match self.user {
            Some(user) => {
                let _ = write!(
                    nav,
                    r#" <span class="user">Logged in as {}</span> <a href="/api/logout">Log out</a>"#,
                    text(&user.username)
                );
            }
            None => nav.push_str(r#" <a href="/login">Log in</a> <a href="/register">Register</a>"#),
        }

        let mut flashes = String::new();
        for flash in self.flashes {
            let _ = write!(
                flashes,
                r#"<div class="flash {}">{}</div>"#,
                flash.kind.css_class(),
                text(&flash.message)
            );
        }

        Html(format!(
            r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{title} | DynaSearch</title>
<link rel="stylesheet" href="/static/style.css">
</head>
<body>
<nav>{nav}</nav>
{flashes}
<main>
{body}
</main>
</body>
</html>
"#,
            title = text(self.title),
        ))
    }
}

pub fn search(layout: &Layout<'_>, query: &str, language: &str, results: &[Page]) -> Html<String> {
    let mut body = format!(
        r#"<form action="/" method="get" class="search">
<input id="search-input" type="search" name="q" value="{}" placeholder="Search...">
<input type="hidden" name="language" value="{}">
<button id="search-button" type="submit">Search</button>
</form>
<script src="/static/search.js"></script>
"#,
        attr(query),
        attr(language)
    );

    if !query.is_empty() {
        if results.is_empty() {
            let _ = write!(
                body,
                r#"<p class="no-results">No results for "{}".</p>"#,
                text(query)
            );
        } else {
            body.push_str(r#"<ul id="results">"#);
            for page in results {
                let title = match page.url.as_deref().filter(|url| is_web_link(url)) {
                    Some(url) => format!(r#"<a href="{}">{}</a>"#, attr(url), text(&page.title)),
                    None => text(&page.title).into_owned(),
                };
                let _ = write!(
                    body,
                    r#"<li><h3>{title}</h3><p>{}</p></li>"#,
                    text(&snippet(&page.content, 240))
                );
            }
            body.push_str("</ul>");
        }
    }

    layout.render(&body)
}

pub fn about(layout: &Layout<'_>) -> Html<String> {
    layout.render(
        "<h1>About DynaSearch</h1>\
         <p>DynaSearch searches a collection of crawled pages and shows the \
         weather forecast for Copenhagen.</p>",
    )
}

pub fn weather(layout: &Layout<'_>, forecast: Option<&Value>) -> Html<String> {
    let Some(forecast) = forecast else {
        return layout.render("<h1>Weather</h1><p>No forecast available right now.</p>");
    };

    let city = forecast
        .get("city_name")
        .and_then(Value::as_str)
        .unwrap_or("Unknown location");
    let mut body = format!(
        r#"<h1>Weather forecast for {}</h1><table class="forecast"><tr><th>Date</th><th>Conditions</th><th>Low</th><th>High</th></tr>"#,
        text(city)
    );

    let days = forecast
        .get("data")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();
    for day in days {
        let field = |name: &str| match day.get(name) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => "-".to_string(),
        };
        let description = day
            .pointer("/weather/description")
            .and_then(Value::as_str)
            .unwrap_or("-");
        let _ = write!(
            body,
            "<tr><td>{}</td><td>{}</td><td>{}&deg;C</td><td>{}&deg;C</td></tr>",
            text(&field("valid_date")),
            text(description),
            text(&field("min_temp")),
            text(&field("max_temp"))
        );
    }
    body.push_str("</table>");

    layout.render(&body)
}

pub fn login(layout: &Layout<'_>, username: &str) -> Html<String> {
    layout.render(&format!(
        r#"<h1>Log in</h1>
<form action="/api/login" method="post">
<label>Username <input type="text" name="username" value="{}"></label>
<label>Password <input type="password" name="password"></label>
<button type="submit">Log in</button>
</form>
<p><a href="/reset_password">Forgot your password?</a></p>"#,
        attr(username)
    ))
}

pub fn register(layout: &Layout<'_>, username: &str, email: &str) -> Html<String> {
    layout.render(&format!(
        r#"<h1>Register</h1>
<form action="/api/register" method="post">
<label>Username <input type="text" name="username" value="{}"></label>
<label>Email <input type="email" name="email" value="{}"></label>
<label>Password <input type="password" name="password"></label>
<label>Password (repeat) <input type="password" name="password2"></label>
<button type="submit">Register</button>
</form>"#,
        attr(username),
        attr(email)
    ))
}

pub fn request_reset(layout: &Layout<'_>) -> Html<String> {
    layout.render(
        r#"<h1>Reset password</h1>
<form action="/api/request_reset_password" method="post">
<label>Email <input type="email" name="email"></label>
<button type="submit">Send reset link</button>
</form>"#,
    )
}

/// New-password form. `token` is `None` for a forced reset.
pub fn reset_password(layout: &Layout<'_>, token: Option<&str>) -> Html<String> {
    let (heading, hidden) = match token {
        Some(token) => (
            "Choose a new password".to_string(),
            format!(r#"<input type="hidden" name="token" value="{}">"#, attr(token)),
        ),
        None => (
            "Your password must be changed before you can continue".to_string(),
            String::new(),
        ),
    };

    layout.render(&format!(
        r#"<h1>{heading}</h1>
<form action="/reset_password" method="post">
{hidden}
<label>New password <input type="password" name="password"></label>
<label>New password (repeat) <input type="password" name="password2"></label>
<button type="submit">Set password</button>
</form>"#
    ))
}

pub fn not_found() -> Html<String> {
    Layout {
        title: "Not found",
        user: None,
        flashes: &[],
    }
    .render(r#"<h1>Page not found</h1><p><a href="/">Back to search</a></p>"#)
}

pub fn server_error() -> Html<String> {
    Layout {
        title: "Error",
        user: None,
        flashes: &[],
    }
    .render("<h1>Internal Server Error</h1><p>Sorry, something went wrong.</p>")
}

/// Only http and https URLs become anchors.
fn is_web_link(url: &str) -> bool {
    url::Url::parse(url).is_ok_and(|url| matches!(url.scheme(), "http" | "https"))
}

/// First `max_chars` characters of `content`, cut at a word boundary.
fn snippet(content: &str, max_chars: usize) -> String {
    if content.chars().count() <= max_chars {
        return content.to_string();
    }

    let cut: String = content.chars().take(max_chars).collect();
    let end = cut.rfind(char::is_whitespace).unwrap_or(cut.len());
    format!("{}…", cut[..end].trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn layout() -> Layout<'static> {
        Layout {
            title: "Test",
            user: None,
            flashes: &[],
        }
    }

    #[test]
    fn test_user_input_is_escaped() {
        let html = search(&layout(), "<script>", "en", &[]).0;
        assert!(!html.contains("<script>\""));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn test_search_lists_results() {
        let pages = vec![Page {
            title: "Rust & Friends".to_string(),
            url: Some("https://example.com/rust".to_string()),
            language: "en".to_string(),
            last_updated: None,
            content: "Systems programming".to_string(),
        }];
        let html = search(&layout(), "rust", "en", &pages).0;
        assert!(html.contains("Rust &amp; Friends"));
        assert!(html.contains(r#"href="https://example.com/rust""#));
    }

    #[test]
    fn test_search_does_not_link_script_urls() {
        let page = |title: &str, url: &str| Page {
            title: title.to_string(),
            url: Some(url.to_string()),
            language: "en".to_string(),
            last_updated: None,
            content: "content".to_string(),
        };
        let pages = vec![
            page("Script", "javascript:alert(1)"),
            page("Data", "data:text/html,<b>hi</b>"),
            page("Relative", "/local/path"),
            page("Plain", "http://example.com/plain"),
        ];

        let html = search(&layout(), "x", "en", &pages).0;
        assert!(!html.contains("javascript:"));
        assert!(!html.contains(r#"href="data:"#));
        assert!(!html.contains(r#"href="/local/path""#));
        assert!(html.contains("<h3>Script</h3>"));
        assert!(html.contains(r#"href="http://example.com/plain""#));
    }

    #[test]
    fn test_weather_table() {
        let forecast = json!({
            "city_name": "Copenhagen",
            "data": [
                {"valid_date": "2024-05-01", "min_temp": 4.5, "max_temp": 12, "weather": {"description": "Light rain"}}
            ]
        });
        let html = weather(&layout(), Some(&forecast)).0;
        assert!(html.contains("Weather forecast for Copenhagen"));
        assert!(html.contains("<td>Light rain</td>"));
        assert!(html.contains("<td>4.5&deg;C</td>"));
    }

    #[test]
    fn test_flashes_rendered() {
        let flashes = [Flash::error("The username is already taken")];
        let html = Layout {
            title: "Register",
            user: None,
            flashes: &flashes,
        }
        .render("")
        .0;
        assert!(html.contains(r#"<div class="flash flash-error">The username is already taken</div>"#));
    }

    #[test]
    fn test_snippet() {
        assert_eq!(snippet("short", 10), "short");
        assert_eq!(snippet("hello brave new world", 12), "hello brave…");
    }
}
