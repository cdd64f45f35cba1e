use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::extract::CookieJar;

use crate::error::AppError;

pub const CSRF_COOKIE: &str = "csrftoken";
pub const CSRF_HEADER: &str = "X-CSRF-Token";

/// Double-submit CSRF check for state-changing routes.
///
/// Passes when the `X-CSRF-Token` header equals the `csrftoken` cookie issued
/// by `GET /csrf`.
pub struct CsrfGuard;

impl<S> FromRequestParts<S> for CsrfGuard
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let cookie = jar.get(CSRF_COOKIE).ok_or(AppError::CsrfInvalid)?;
        let header = parts
            .headers
            .get(CSRF_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or(AppError::CsrfInvalid)?;

        if cookie.value().is_empty() || !tokens_match(cookie.value(), header) {
            return Err(AppError::CsrfInvalid);
        }
        Ok(CsrfGuard)
    }
}

fn tokens_match(a: &str, b: &str) -> bool {
    a.len() == b.len()
        && a.bytes()
            .zip(b.bytes())
            .fold(0u8, |acc, (x, y)| acc | (x ^ y))
            == 0
}
