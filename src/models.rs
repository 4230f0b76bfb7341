use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::model::employee::Employee;

#[derive(Deserialize, ToSchema)]
pub struct SignUpReq {
    #[schema(example = "Jane Doe")]
    pub name: String,
    #[schema(example = "jane@company.com", format = "email")]
    pub email: String,
    #[schema(example = "correct horse battery staple")]
    pub password: String,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginReqDto {
    #[schema(example = "jane@company.com", format = "email")]
    pub email: String,
    #[schema(example = "correct horse battery staple")]
    pub password: String,
}

#[derive(Serialize, ToSchema)]
pub struct AuthResponse {
    pub access_token: String,
    #[schema(example = 900)]
    pub expires_in: usize,
    pub profile: Employee,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Employee uid.
    pub sub: String,
    pub email: String,
    pub exp: usize,
    pub jti: String,
}
