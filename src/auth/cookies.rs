use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use time::OffsetDateTime;

use super::token::{TokenConfig, TokenKind};
use super::types::SessionTokens;

pub const ACCESS_COOKIE_NAME: &str = "access_token";
pub const REFRESH_COOKIE_NAME: &str = "refresh_token";

fn secure_cookies() -> bool {
    std::env::var("APP_ENV")
        .map(|env| env == "production")
        .unwrap_or(false)
}

fn session_cookie(name: &'static str, value: String, ttl: chrono::Duration) -> Cookie<'static> {
    let max_age = time::Duration::seconds(ttl.num_seconds());

    Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure_cookies())
        .max_age(max_age)
        .expires(OffsetDateTime::now_utc() + max_age)
        .build()
}

fn expired_cookie(name: &'static str) -> Cookie<'static> {
    Cookie::build((name, ""))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure_cookies())
        .max_age(time::Duration::ZERO)
        .expires(OffsetDateTime::UNIX_EPOCH)
        .build()
}

/// Sets the access/refresh cookie pair, each expiring with its token
pub fn add_session_cookies(
    jar: CookieJar,
    tokens: &SessionTokens,
    config: &TokenConfig,
) -> CookieJar {
    jar.add(session_cookie(
        ACCESS_COOKIE_NAME,
        tokens.access_token.clone(),
        config.ttl(TokenKind::Access),
    ))
    .add(session_cookie(
        REFRESH_COOKIE_NAME,
        tokens.refresh_token.clone(),
        config.ttl(TokenKind::Refresh),
    ))
}

/// Overwrites both cookies with an immediate expiry
pub fn clear_session_cookies(jar: CookieJar) -> CookieJar {
    jar.add(expired_cookie(ACCESS_COOKIE_NAME))
        .add(expired_cookie(REFRESH_COOKIE_NAME))
}
