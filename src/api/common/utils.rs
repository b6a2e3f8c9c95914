use cookie::{Cookie, SameSite};
use time::OffsetDateTime;
use tower_cookies::Cookies;
use uuid::Uuid;

use crate::authentication::TokenPair;
use crate::config::AuthSettings;
use crate::errors::AppError;
use crate::models::{is_owned_by, Owned};

pub const ACCESS_TOKEN_COOKIE: &str = "accessToken";
pub const REFRESH_TOKEN_COOKIE: &str = "refreshToken";

fn session_cookie(
    name: &'static str,
    value: String,
    ttl: chrono::Duration,
    settings: &AuthSettings,
) -> Cookie<'static> {
    let mut cookie = Cookie::new(name, value);
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie.set_secure(settings.cookie_secure);
    cookie.set_same_site(if settings.cookie_secure {
        SameSite::None
    } else {
        SameSite::Lax
    });
    cookie.set_expires(OffsetDateTime::now_utc() + time::Duration::seconds(ttl.num_seconds()));
    cookie
}

pub fn set_session_cookies(tokens: &TokenPair, settings: &AuthSettings, cookies: &Cookies) {
    cookies.add(session_cookie(
        ACCESS_TOKEN_COOKIE,
        tokens.access_token.clone(),
        settings.access_token_ttl,
        settings,
    ));
    cookies.add(session_cookie(
        REFRESH_TOKEN_COOKIE,
        tokens.refresh_token.clone(),
        settings.refresh_token_ttl,
        settings,
    ));
}

pub fn clear_session_cookies(cookies: &Cookies) {
    for name in [ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE] {
        let mut cookie = Cookie::from(name);
        cookie.set_path("/");
        cookie.make_removal();
        cookies.remove(cookie);
    }
}

/// Parses a path identifier, naming it in the error message.
pub fn parse_id(raw: &str, what: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw.trim())
        .map_err(|_| AppError::InvalidArgument(format!("Invalid {} id", what)))
}

/// NotFound when the record is absent, Forbidden when someone else owns it.
pub fn ensure_owner<T: Owned>(
    record: Option<T>,
    requester_id: Uuid,
    what: &str,
) -> Result<T, AppError> {
    let record = record.ok_or_else(|| AppError::NotFound(format!("{} not found", what)))?;
    if !is_owned_by(&record, requester_id) {
        tracing::warn!(requester = %requester_id, owner = %record.owner_id(), "{} ownership mismatch", what);
        return Err(AppError::Forbidden(format!(
            "You are not allowed to modify this {}",
            what.to_lowercase()
        )));
    }
    Ok(record)
}

/// Trims a required text field, rejecting blank values.
pub fn required_text(value: Option<String>, field: &str) -> Result<String, AppError> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(AppError::InvalidArgument(format!("{} is required", field))),
    }
}

/// Trims an optional text field; blank counts as absent.
pub fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
