use axum::{extract::FromRequestParts, http::header, http::request::Parts};
use axum_extra::extract::CookieJar;
use uuid::Uuid;

use crate::crud::{Crud, CrudError};
use crate::entity::user;
use crate::error::AppError;
use crate::state::AppState;
use crate::utils::jwt;

/// Authenticated principal.
///
/// The token is read from the auth cookie first, then from an
/// `Authorization: Bearer <token>` header for API clients. The account is
/// reloaded on every request, so deactivation, demotion and deletion apply
/// to sessions that are already open.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub email: String,
    pub is_superuser: bool,
}

impl AuthUser {
    /// Returns `Ok(())` for superusers, `Err(PermissionDenied)` otherwise.
    pub fn require_superuser(&self) -> Result<(), AppError> {
        if self.is_superuser {
            Ok(())
        } else {
            Err(AppError::PermissionDenied)
        }
    }
}

fn bearer_token(parts: &Parts) -> Option<Result<String, AppError>> {
    let value = parts.headers.get(header::AUTHORIZATION)?;
    Some(
        value
            .to_str()
            .ok()
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::to_owned)
            .ok_or(AppError::TokenInvalid),
    )
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let token = match jar.get(&state.config.auth.cookie_name) {
            Some(cookie) => cookie.value().to_owned(),
            None => bearer_token(parts).ok_or(AppError::TokenMissing)??,
        };

        let claims = jwt::verify(&token, &state.config.auth.jwt_secret)
            .map_err(|_| AppError::TokenInvalid)?;
        let user_id = claims.user_id().map_err(|_| AppError::TokenInvalid)?;

        let account = match Crud::<user::Entity>::new()
            .read_by_primary_key(&state.db, user_id, false)
            .await
        {
            Ok(account) => account.into_inner(),
            Err(CrudError::NotFound(_)) => return Err(AppError::TokenInvalid),
            Err(e) => return Err(e.into()),
        };
        if !account.is_active {
            tracing::debug!(%user_id, "Token presented for inactive account");
            return Err(AppError::TokenInvalid);
        }

        Ok(AuthUser {
            user_id,
            email: account.email,
            is_superuser: account.is_superuser,
        })
    }
}

/// An [`AuthUser`] that has already passed `require_superuser`.
pub struct SuperUser(pub AuthUser);

impl FromRequestParts<AppState> for SuperUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        user.require_superuser()?;
        Ok(SuperUser(user))
    }
}
