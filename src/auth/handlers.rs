use actix_web::{HttpRequest, HttpResponse, web};
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

use crate::{
    auth::{
        jwt::{generate_access_token, verify_token},
        password::{hash_password, verify_password},
    },
    config::Config,
    error::ApiError,
    model::{
        account::Account,
        employee::{Employee, UserType},
    },
    models::{AuthResponse, LoginReqDto, SignUpReq},
    state::AppState,
    store::StoreError,
    utils::email_filter::normalize,
};

/// true  => email AVAILABLE
/// false => email TAKEN
pub async fn is_email_available(email: &str, state: &AppState) -> Result<bool, ApiError> {
    // Cuckoo filter gives a fast negative.
    if !state.emails.might_exist(email) {
        return Ok(true);
    }
    Ok(state.store().find_account(&normalize(email)).await?.is_none())
}

/// Creates credentials and a profile in one store write.
pub async fn register_account(
    state: &AppState,
    name: &str,
    email: &str,
    password: &str,
    user_type: UserType,
) -> Result<Employee, ApiError> {
    let email = normalize(email);
    let password_hash = hash_password(password).map_err(|e| {
        error!(error = %e, "Password hashing failed");
        ApiError::Internal
    })?;

    let uid = Uuid::new_v4().to_string();
    let account = Account {
        uid: uid.clone(),
        email: email.clone(),
        password_hash,
    };
    let profile = Employee::new(uid, name.trim().to_string(), email.clone(), user_type);

    match state.store().create_account(&account, &profile).await {
        Ok(()) => {}
        Err(StoreError::DuplicateEmail(_)) => {
            state.emails.insert(&email);
            return Err(ApiError::Conflict("Email already registered".into()));
        }
        Err(e) => return Err(e.into()),
    }

    state.emails.insert(&email);
    state.sessions.remember(profile.clone()).await;
    Ok(profile)
}

fn issue_token(profile: Employee, config: &Config) -> Result<AuthResponse, ApiError> {
    let (access_token, _) =
        generate_access_token(&profile.uid, &profile.email, &config.jwt_secret, config.access_token_ttl)
            .map_err(|e| {
                error!(error = %e, "Token generation failed");
                ApiError::Internal
            })?;

    Ok(AuthResponse {
        access_token,
        expires_in: config.access_token_ttl,
        profile,
    })
}

/// Sign up as an employee
#[utoipa::path(
    post,
    path = "/auth/signup",
    request_body = SignUpReq,
    responses(
        (status = 201, description = "Account and profile created", body = AuthResponse),
        (status = 400, description = "Missing name, email or password"),
        (status = 409, description = "Email already registered")
    ),
    tag = "Auth"
)]
#[instrument(name = "auth_signup", skip(state, config, user), fields(email = %user.email))]
pub async fn signup(
    user: web::Json<SignUpReq>,
    state: web::Data<AppState>,
    config: web::Data<Config>,
) -> Result<HttpResponse, ApiError> {
    if user.name.trim().is_empty() || user.email.trim().is_empty() || user.password.is_empty() {
        return Err(ApiError::BadRequest(
            "Name, email and password must not be empty".into(),
        ));
    }

    if !is_email_available(&user.email, &state).await? {
        return Err(ApiError::Conflict("Email already registered".into()));
    }

    let profile = register_account(
        &state,
        &user.name,
        &user.email,
        &user.password,
        UserType::Employee,
    )
    .await?;
    info!(uid = %profile.uid, "Account created");

    Ok(HttpResponse::Created().json(issue_token(profile, &config)?))
}

/// Log in with email and password
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginReqDto,
    responses(
        (status = 200, description = "Signed in", body = AuthResponse),
        (status = 400, description = "Missing email or password"),
        (status = 401, description = "Invalid credentials")
    ),
    tag = "Auth"
)]
#[instrument(name = "auth_login", skip(state, config, user), fields(email = %user.email))]
pub async fn login(
    user: web::Json<LoginReqDto>,
    state: web::Data<AppState>,
    config: web::Data<Config>,
) -> Result<HttpResponse, ApiError> {
    info!("Login request received");

    if user.email.trim().is_empty() || user.password.is_empty() {
        info!("Validation failed: empty email or password");
        return Err(ApiError::BadRequest("Email and password required".into()));
    }

    debug!("Fetching account");
    let Some(account) = state.store().find_account(&normalize(&user.email)).await? else {
        info!("Invalid credentials: account not found");
        return Err(ApiError::Unauthorized("Invalid credentials".into()));
    };

    if let Err(e) = verify_password(&user.password, &account.password_hash) {
        info!(error = %e, "Invalid credentials: password mismatch");
        return Err(ApiError::Unauthorized("Invalid credentials".into()));
    }

    let profile = state
        .sessions
        .profile(&account.uid)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Profile not found".into()))?;

    info!(uid = %profile.uid, "Login successful");
    Ok(HttpResponse::Ok().json(issue_token(profile, &config)?))
}

/// Sign out and revoke the presented token
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 204, description = "Signed out (also returned for missing or invalid tokens)")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Auth"
)]
pub async fn logout(
    req: HttpRequest,
    state: web::Data<AppState>,
    config: web::Data<Config>,
) -> HttpResponse {
    let token = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "));

    // Idempotent: anything unusable is already signed out.
    let Some(claims) = token.and_then(|t| verify_token(t, &config.jwt_secret).ok()) else {
        return HttpResponse::NoContent().finish();
    };

    state.sessions.revoke(&claims.jti).await;
    state.sessions.invalidate(&claims.sub).await;
    info!(uid = %claims.sub, "Signed out");

    HttpResponse::NoContent().finish()
}

/// Creates the configured administrator when no account exists for it yet.
pub async fn bootstrap_admin(state: &AppState, config: &Config) -> anyhow::Result<()> {
    let Some(admin) = &config.bootstrap_admin else {
        return Ok(());
    };

    if state.store().find_account(&normalize(&admin.email)).await?.is_some() {
        debug!(email = %admin.email, "Bootstrap admin already present");
        return Ok(());
    }

    match register_account(state, &admin.name, &admin.email, &admin.password, UserType::Admin).await {
        Ok(profile) => {
            info!(uid = %profile.uid, email = %profile.email, "Bootstrap admin created");
            Ok(())
        }
        Err(e) => Err(anyhow::anyhow!("failed to create bootstrap admin: {e}")),
    }
}
