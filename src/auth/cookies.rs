//! httpOnly cookies carrying the token pair.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use time::Duration;

use super::tokens::TokenPair;

pub const ACCESS_COOKIE: &str = "accessToken";
pub const REFRESH_COOKIE: &str = "refreshToken";

#[derive(Debug, Clone, Copy)]
pub struct CookieSettings {
    /// Production only; local development runs over plain HTTP.
    pub secure: bool,
    pub access_max_age: Duration,
    pub refresh_max_age: Duration,
}

impl CookieSettings {
    fn build(&self, name: &'static str, value: String, max_age: Duration) -> Cookie<'static> {
        Cookie::build((name, value))
            .http_only(true)
            .secure(self.secure)
            .same_site(SameSite::Lax)
            .path("/")
            .max_age(max_age)
            .build()
    }

    pub fn set_tokens(&self, jar: CookieJar, pair: &TokenPair) -> CookieJar {
        jar.add(self.build(ACCESS_COOKIE, pair.access_token.clone(), self.access_max_age))
            .add(self.build(REFRESH_COOKIE, pair.refresh_token.clone(), self.refresh_max_age))
    }

    pub fn clear_tokens(&self, jar: CookieJar) -> CookieJar {
        jar.add(self.build(ACCESS_COOKIE, String::new(), Duration::ZERO))
            .add(self.build(REFRESH_COOKIE, String::new(), Duration::ZERO))
    }
}
