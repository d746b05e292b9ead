//! Role-based access control extractors.
//!
//! Each extractor wraps [`AuthUser`] and rejects requests whose role does not
//! meet the requirement, so handlers never re-check roles themselves.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use studyroom_core::error::CoreError;
use studyroom_core::roles::{can_tutor, ROLE_ADMIN};

use super::auth::AuthUser;
use crate::error::AppError;
use crate::state::AppState;

/// Requires the `admin` role. Rejects with 403 otherwise.
pub struct RequireAdmin(pub AuthUser);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if user.role != ROLE_ADMIN {
            return Err(AppError::Core(CoreError::Forbidden(
                "Admin role required".into(),
            )));
        }
        Ok(RequireAdmin(user))
    }
}

/// Requires `tutor` or `admin`. Rejects with 403 otherwise.
///
/// ```ignore
/// async fn claim(RequireTutor(user): RequireTutor) -> AppResult<impl IntoResponse> { .. }
/// ```
pub struct RequireTutor(pub AuthUser);

impl FromRequestParts<AppState> for RequireTutor {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if !can_tutor(&user.role) {
            return Err(AppError::Core(CoreError::Forbidden(
                "Tutor or Admin role required".into(),
            )));
        }
        Ok(RequireTutor(user))
    }
}
