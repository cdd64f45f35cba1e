use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};
use sea_orm::ActiveValue::Set;
use tracing::instrument;

use crate::crud::{Crud, Found};
use crate::entity::user;
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::auth::{
    LoginRequest, MeResponse, RegisterRequest, RegisterResponse, validate_login_request,
    validate_register_request,
};
use crate::state::AppState;
use crate::utils::{hash, jwt};

#[utoipa::path(
    post,
    path = "/auth/register",
    tag = "Auth",
    operation_id = "register",
    summary = "Register a new account",
    description = "Creates an active, unverified, non-superuser account. Emails are stored \
        lower-cased and must be unique.",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = RegisterResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 409, description = "Email already registered (CONFLICT)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, payload), fields(email = %payload.email))]
pub async fn register(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_register_request(&payload)?;

    let hashed = hash::hash_password(&payload.password)
        .map_err(|e| AppError::Internal(format!("Password hash error: {e}")))?;

    let user = Crud::<user::Entity>::new()
        .create(
            &state.db,
            user::ActiveModel {
                email: Set(payload.email.trim().to_lowercase()),
                hashed_password: Set(hashed),
                is_active: Set(true),
                is_verified: Set(false),
                is_superuser: Set(false),
                role_id: Set(None),
                profile_id: Set(None),
                ..Default::default()
            },
        )
        .await
        .map_err(AppError::duplicate("Email is already registered"))?;

    tracing::info!(user_id = %user.id, "Registered user");
    Ok((StatusCode::CREATED, Json(RegisterResponse::from(user))))
}

#[utoipa::path(
    post,
    path = "/auth/jwt/login",
    tag = "Auth",
    operation_id = "login",
    summary = "Log in",
    description = "Verifies the credentials and sets the HttpOnly auth cookie holding a signed JWT. \
        Inactive accounts cannot log in.",
    request_body = LoginRequest,
    responses(
        (status = 204, description = "Logged in; auth cookie set"),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Bad credentials or inactive account (INVALID_CREDENTIALS)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, jar, payload), fields(email = %payload.email))]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    AppJson(payload): AppJson<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_login_request(&payload)?;

    let found = Crud::<user::Entity>::new()
        .read_by_column(&state.db, "email", payload.email.trim(), 0, 2)
        .await?;
    let user = match found {
        Found::One(user) => user,
        Found::None => return Err(AppError::InvalidCredentials),
        Found::Many(_) => {
            return Err(AppError::Internal(
                "More than one account shares an email".into(),
            ));
        }
    };

    let is_valid = hash::verify_password(&payload.password, &user.hashed_password)
        .map_err(|e| AppError::Internal(format!("Password verify error: {e}")))?;
    if !is_valid {
        return Err(AppError::InvalidCredentials);
    }
    if !user.is_active {
        tracing::info!(user_id = %user.id, "Login refused for inactive account");
        return Err(AppError::InvalidCredentials);
    }

    let auth = &state.config.auth;
    let token = jwt::sign(
        user.id,
        &user.email,
        user.is_superuser,
        &auth.jwt_secret,
        auth.token_ttl_secs,
    )
    .map_err(|e| AppError::Internal(format!("JWT sign error: {e}")))?;

    let cookie = Cookie::build((auth.cookie_name.clone(), token))
        .path("/")
        .http_only(true)
        .secure(auth.cookie_secure)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(auth.token_ttl_secs));

    Ok((jar.add(cookie), StatusCode::NO_CONTENT))
}

#[utoipa::path(
    post,
    path = "/auth/jwt/logout",
    tag = "Auth",
    operation_id = "logout",
    summary = "Log out",
    description = "Clears the auth cookie.",
    responses(
        (status = 204, description = "Logged out; auth cookie cleared"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = []), ("cookie" = [])),
)]
#[instrument(skip(state, jar, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn logout(
    auth_user: AuthUser,
    State(state): State<AppState>,
    jar: CookieJar,
) -> impl IntoResponse {
    let removal = Cookie::build(state.config.auth.cookie_name.clone()).path("/");
    (jar.remove(removal), StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/auth/me",
    tag = "Auth",
    operation_id = "me",
    summary = "Current principal",
    responses(
        (status = 200, description = "The logged-in user", body = MeResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = []), ("cookie" = [])),
)]
#[instrument(skip(auth_user), fields(user_id = %auth_user.user_id))]
pub async fn me(auth_user: AuthUser) -> Json<MeResponse> {
    Json(MeResponse {
        id: auth_user.user_id,
        email: auth_user.email,
        is_superuser: auth_user.is_superuser,
    })
}
