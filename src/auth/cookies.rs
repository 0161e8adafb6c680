use anyhow::Context;
use axum::http::{
    header::{COOKIE, SET_COOKIE},
    HeaderMap, HeaderValue,
};
use cookie::{time::Duration as CookieDuration, Cookie, SameSite};

use crate::config::CookieConfig;

fn session_cookie(cfg: &CookieConfig, name: String, value: String, max_age: i64) -> Cookie<'static> {
    Cookie::build((name, value))
        .http_only(cfg.http_only)
        .secure(cfg.secure)
        .same_site(SameSite::Lax)
        .max_age(CookieDuration::seconds(max_age))
        .path("/")
        .build()
}

fn append(headers: &mut HeaderMap, cookie: Cookie<'_>) -> anyhow::Result<()> {
    let value = HeaderValue::from_str(&cookie.to_string()).context("encode Set-Cookie")?;
    headers.append(SET_COOKIE, value);
    Ok(())
}

/// Sets the session cookie holding `token` for `max_age` seconds.
pub fn set_auth_cookies(
    headers: &mut HeaderMap,
    cfg: &CookieConfig,
    token: &str,
    max_age: i64,
) -> anyhow::Result<()> {
    append(
        headers,
        session_cookie(cfg, cfg.name.clone(), token.to_string(), max_age),
    )
}

/// Expires the session cookie and every legacy name still seen in the wild.
pub fn clear_all_auth_cookies(headers: &mut HeaderMap, cfg: &CookieConfig) -> anyhow::Result<()> {
    for name in std::iter::once(&cfg.name).chain(cfg.legacy_names.iter()) {
        append(headers, session_cookie(cfg, name.clone(), String::new(), 0))?;
    }
    Ok(())
}

/// First non-empty value among the recognized cookie names, primary name first.
pub fn token_from_cookies(headers: &HeaderMap, cfg: &CookieConfig) -> Option<String> {
    let cookies: Vec<Cookie<'static>> = headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|raw| Cookie::split_parse(raw.to_string()))
        .filter_map(Result::ok)
        .collect();

    std::iter::once(&cfg.name)
        .chain(cfg.legacy_names.iter())
        .find_map(|name| {
            cookies
                .iter()
                .find(|c| c.name() == name && !c.value().is_empty())
                .map(|c| c.value().to_string())
        })
}
