use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload, web::Data};
use futures::future::LocalBoxFuture;

use crate::{error::ApiError, model::employee::Employee, models::Claims, state::AppState};

/// The caller behind a verified bearer token, with their current profile.
///
/// The role comes from the profile state, not from the token.
pub struct AuthUser {
    pub claims: Claims,
    pub profile: Employee,
}

impl FromRequest for AuthUser {
    type Error = ApiError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let claims = req.extensions().get::<Claims>().cloned();
        let state = req.app_data::<Data<AppState>>().cloned();

        Box::pin(async move {
            let claims = claims.ok_or_else(|| ApiError::Unauthorized("Missing token".into()))?;
            let state = state.ok_or(ApiError::Internal)?;

            let profile = state
                .sessions
                .profile(&claims.sub)
                .await?
                .ok_or_else(|| ApiError::Unauthorized("Profile not found".into()))?;

            Ok(AuthUser { claims, profile })
        })
    }
}

impl AuthUser {
    pub fn uid(&self) -> &str {
        &self.profile.uid
    }

    pub fn require_admin(&self) -> Result<(), ApiError> {
        if self.profile.is_admin() {
            Ok(())
        } else {
            Err(ApiError::Forbidden("Admin only".into()))
        }
    }
}
