use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::Duration;

pub const REFRESH_COOKIE: &str = "refreshToken";
const REFRESH_COOKIE_PATH: &str = "/auth";

/// Cookie carrying a freshly issued refresh token.
pub fn refresh_cookie(token: String, max_age: Duration, secure: bool) -> Cookie<'static> {
    Cookie::build((REFRESH_COOKIE, token))
        .path(REFRESH_COOKIE_PATH)
        .http_only(true)
        .same_site(SameSite::Strict)
        .secure(secure)
        .max_age(time::Duration::seconds(max_age.num_seconds()))
        .build()
}

/// Drops the refresh cookie from `jar`. The removal keeps the path it was
/// issued with so the browser matches it.
pub fn clear_refresh_cookie(jar: CookieJar, secure: bool) -> CookieJar {
    jar.remove(
        Cookie::build(REFRESH_COOKIE)
            .path(REFRESH_COOKIE_PATH)
            .http_only(true)
            .same_site(SameSite::Strict)
            .secure(secure),
    )
}

pub fn read_refresh_cookie(jar: &CookieJar) -> Option<String> {
    jar.get(REFRESH_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
}
