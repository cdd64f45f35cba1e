use axum::{Json, extract::State, response::IntoResponse};
use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};

use crate::extractors::csrf::CSRF_COOKIE;
use crate::models::auth::CsrfResponse;
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/csrf",
    tag = "Auth",
    operation_id = "issueCsrfToken",
    summary = "Issue a CSRF token",
    description = "Sets a fresh `csrftoken` cookie and returns the same value. State-changing \
        admin routes expect it back in the `X-CSRF-Token` header.",
    responses(
        (status = 200, description = "Token issued", body = CsrfResponse),
    ),
)]
pub async fn issue_csrf_token(State(state): State<AppState>, jar: CookieJar) -> impl IntoResponse {
    let token = hex::encode(rand::random::<[u8; 32]>());
    let cookie = Cookie::build((CSRF_COOKIE, token.clone()))
        .path("/")
        .secure(state.config.auth.cookie_secure)
        .same_site(SameSite::Strict);
    (jar.add(cookie), Json(CsrfResponse { csrf_token: token }))
}
