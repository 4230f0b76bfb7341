use actix_web::middleware::Next;
use actix_web::{
    Error, HttpMessage, HttpResponse,
    body::BoxBody,
    dev::{ServiceRequest, ServiceResponse},
    web::Data,
};
use serde_json::json;

use crate::auth::jwt::verify_token;
use crate::config::Config;
use crate::state::AppState;

/// Verifies the bearer token and stores its claims in request extensions.
pub async fn auth_middleware(
    req: ServiceRequest,
    next: Next<BoxBody>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    let config = req
        .app_data::<Data<Config>>()
        .cloned()
        .ok_or_else(|| actix_web::error::ErrorInternalServerError("App config missing"))?;
    let state = req
        .app_data::<Data<AppState>>()
        .cloned()
        .ok_or_else(|| actix_web::error::ErrorInternalServerError("App state missing"))?;

    let header_value = match req.headers().get("Authorization") {
        Some(h) => h.to_str().map_err(|_| {
            actix_web::error::ErrorUnauthorized(
                json!({"error": "Invalid Authorization header encoding", "code": "UNAUTHORIZED"}),
            )
        })?,
        None => return Ok(unauthorized(req, "Missing Authorization header", None)),
    };

    let token = match header_value.strip_prefix("Bearer ") {
        Some(t) => t,
        None => {
            return Ok(unauthorized(
                req,
                "Authorization header must start with Bearer",
                None,
            ));
        }
    };

    let claims = match verify_token(token, &config.jwt_secret) {
        Ok(c) => c,
        Err(e) => return Ok(unauthorized(req, "Invalid or expired token", Some(e))),
    };

    if state.sessions.is_revoked(&claims.jti).await {
        return Ok(unauthorized(req, "Token has been revoked", None));
    }

    req.extensions_mut().insert(claims);

    next.call(req).await
}

fn unauthorized(req: ServiceRequest, message: &str, details: Option<String>) -> ServiceResponse<BoxBody> {
    let mut body = json!({"error": message, "code": "UNAUTHORIZED"});
    if let Some(details) = details {
        body["details"] = json!(details);
    }
    let resp = HttpResponse::Unauthorized().json(body);
    req.into_response(resp.map_into_boxed_body())
}
