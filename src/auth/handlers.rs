use crate::{
    auth::{
        auth::{AuthUser, bearer_token},
        jwt::{expires_at, generate_access_token, generate_refresh_token, verify_token},
        password::{hash_password, verify_password},
    },
    config::Config,
    model::user::{NewUser, User},
    models::{AuthResponse, LoginReqDto, RegisterReq, TokenType},
    state::AppState,
    store::{StoreError, UserStore},
    utils::{identity_cache, identity_filter},
};
use actix_web::{HttpRequest, HttpResponse, error::ErrorInternalServerError, web};
use serde_json::json;
use tracing::{debug, error, info, instrument};

fn token_error(e: jsonwebtoken::errors::Error) -> actix_web::Error {
    error!(error = %e, "Failed to sign token");
    ErrorInternalServerError("Internal Server Error")
}

/// Signs an access/refresh pair and stores the refresh token id.
async fn issue_token_pair(
    user: &User,
    users: &dyn UserStore,
    config: &Config,
) -> actix_web::Result<(String, String)> {
    let access_token = generate_access_token(
        user.id,
        user.email.clone(),
        user.role_id,
        &config.jwt_secret,
        config.access_token_ttl,
    )
    .map_err(token_error)?;

    let (refresh_token, refresh_claims) = generate_refresh_token(
        user.id,
        user.email.clone(),
        user.role_id,
        &config.jwt_secret,
        config.refresh_token_ttl,
    )
    .map_err(token_error)?;

    debug!(user_id = user.id, jti = %refresh_claims.jti, "Storing refresh token");
    users
        .save_refresh_token(user.id, &refresh_claims.jti, expires_at(&refresh_claims))
        .await?;

    Ok((access_token, refresh_token))
}

/// true  => email and employee code are both AVAILABLE
/// false => at least one is TAKEN
pub async fn is_identity_available(
    email: &str,
    employee_code: &str,
    users: &dyn UserStore,
) -> Result<bool, StoreError> {
    let keys = [
        identity_filter::email_key(email),
        identity_filter::code_key(employee_code),
    ];

    // Cuckoo filter: fast negative
    if keys.iter().all(|k| !identity_filter::might_exist(k)) {
        return Ok(true);
    }

    // Moka cache: fast positive
    for key in &keys {
        if identity_cache::is_taken(key).await {
            return Ok(false);
        }
    }

    Ok(!users.identity_exists(email, employee_code).await?)
}

async fn remember_identity(user: &User) {
    for key in [
        identity_filter::email_key(&user.email),
        identity_filter::code_key(&user.employee_code),
    ] {
        identity_filter::insert(&key);
        identity_cache::mark_taken(&key).await;
    }
}

/// Register a user
#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterReq,
    responses(
        (status = 201, description = "User registered", body = AuthResponse),
        (status = 400, description = "Missing required fields", body = Object, example = json!({
            "message": "Name, email, password and employee code are required"
        })),
        (status = 409, description = "Email or employee code already registered"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Auth"
)]
#[instrument(name = "auth_register", skip(state, config, user), fields(email = %user.email))]
pub async fn register(
    user: web::Json<RegisterReq>,
    state: web::Data<AppState>,
    config: web::Data<Config>,
) -> actix_web::Result<HttpResponse> {
    let req = user.into_inner();
    let name = req.name.trim();
    let email = req.email.trim().to_lowercase();
    let employee_code = req.employee_code.trim();

    if name.is_empty() || email.is_empty() || req.password.is_empty() || employee_code.is_empty()
    {
        info!("Validation failed: missing registration fields");
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "Name, email, password and employee code are required"
        })));
    }

    if !is_identity_available(&email, employee_code, state.users.as_ref()).await? {
        info!("Registration rejected: identity taken");
        return Ok(HttpResponse::Conflict().json(json!({
            "message": "Email or employee code already registered"
        })));
    }

    let hashed = hash_password(&req.password).map_err(|e| {
        error!(error = %e, "Failed to hash password");
        ErrorInternalServerError("Failed to register user")
    })?;

    let new_user = NewUser {
        name: name.to_string(),
        email,
        password: hashed,
        role: req.role.unwrap_or_default(),
        employee_code: employee_code.to_string(),
        department: req
            .department
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty()),
    };

    // the pre-check can race with another registration
    let created = match state.users.create_user(new_user).await {
        Ok(user) => user,
        Err(StoreError::Duplicate(what)) => {
            info!(what, "Registration rejected: duplicate");
            return Ok(HttpResponse::Conflict().json(json!({
                "message": format!("{} already registered", what)
            })));
        }
        Err(e) => return Err(e.into()),
    };

    remember_identity(&created).await;

    let (access_token, refresh_token) =
        issue_token_pair(&created, state.users.as_ref(), &config).await?;

    info!(user_id = created.id, role = %created.profile().role, "User registered");

    Ok(HttpResponse::Created().json(AuthResponse {
        user: created.profile(),
        access_token,
        refresh_token,
    }))
}

/// Log in with email and password
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginReqDto,
    responses(
        (status = 200, description = "Logged in", body = AuthResponse),
        (status = 400, description = "Email or password missing"),
        (status = 401, description = "Invalid credentials", body = Object, example = json!({
            "message": "Invalid credentials"
        })),
        (status = 500, description = "Internal server error")
    ),
    tag = "Auth"
)]
#[instrument(name = "auth_login", skip(state, config, user), fields(email = %user.email))]
pub async fn login(
    user: web::Json<LoginReqDto>,
    state: web::Data<AppState>,
    config: web::Data<Config>,
) -> actix_web::Result<HttpResponse> {
    info!("Login request received");

    let email = user.email.trim().to_lowercase();
    if email.is_empty() || user.password.is_empty() {
        info!("Validation failed: empty email or password");
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "Email and password are required"
        })));
    }

    let invalid = || HttpResponse::Unauthorized().json(json!({ "message": "Invalid credentials" }));

    let db_user = match state.users.find_by_email(&email).await? {
        Some(u) => {
            debug!(user_id = u.id, "User found");
            u
        }
        None => {
            info!("Invalid credentials: user not found");
            return Ok(invalid());
        }
    };

    if let Err(e) = verify_password(&user.password, &db_user.password) {
        info!(error = %e, "Invalid credentials: password mismatch");
        return Ok(invalid());
    }

    let (access_token, refresh_token) =
        issue_token_pair(&db_user, state.users.as_ref(), &config).await?;

    // non-fatal
    if let Err(e) = state.users.touch_last_login(db_user.id).await {
        error!(error = %e, "Failed to update last_login_at");
    }
    identity_cache::mark_taken(&identity_filter::email_key(&db_user.email)).await;

    info!(user_id = db_user.id, "Login successful");

    Ok(HttpResponse::Ok().json(AuthResponse {
        user: db_user.profile(),
        access_token,
        refresh_token,
    }))
}

/// Rotate a refresh token
#[utoipa::path(
    post,
    path = "/auth/refresh",
    responses(
        (status = 200, description = "New token pair", body = Object, example = json!({
            "access_token": "eyJ...",
            "refresh_token": "eyJ..."
        })),
        (status = 401, description = "Missing, invalid, revoked or non-refresh token")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Auth"
)]
#[instrument(name = "auth_refresh", skip(req, state, config))]
pub async fn refresh_token(
    req: HttpRequest,
    state: web::Data<AppState>,
    config: web::Data<Config>,
) -> actix_web::Result<HttpResponse> {
    let token = match bearer_token(&req) {
        Some(t) => t,
        None => return Ok(HttpResponse::Unauthorized().finish()),
    };

    let claims = match verify_token(token, &config.jwt_secret) {
        Ok(c) => c,
        Err(_) => return Ok(HttpResponse::Unauthorized().finish()),
    };

    if claims.token_type != TokenType::Refresh {
        return Ok(HttpResponse::Unauthorized().finish());
    }

    // revoking first makes a replayed token fail
    let owner = match state.users.revoke_refresh_token(&claims.jti).await? {
        Some(user_id) => user_id,
        None => {
            info!(jti = %claims.jti, "Refresh rejected: unknown or revoked token");
            return Ok(HttpResponse::Unauthorized().finish());
        }
    };

    let user = match state.users.find_by_id(owner).await? {
        Some(u) => u,
        None => return Ok(HttpResponse::Unauthorized().finish()),
    };

    let (access_token, refresh_token) =
        issue_token_pair(&user, state.users.as_ref(), &config).await?;

    info!(user_id = user.id, "Refresh token rotated");

    Ok(HttpResponse::Ok().json(json!({
        "access_token": access_token,
        "refresh_token": refresh_token
    })))
}

/// Revoke a refresh token
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 204, description = "Logged out (also when the token was unknown)")
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
    let token = match bearer_token(&req) {
        Some(t) => t,
        None => return HttpResponse::NoContent().finish(),
    };

    let claims = match verify_token(token, &config.jwt_secret) {
        Ok(c) => c,
        Err(_) => return HttpResponse::NoContent().finish(),
    };

    // only refresh tokens can log out
    if claims.token_type != TokenType::Refresh {
        return HttpResponse::NoContent().finish();
    }

    if let Err(e) = state.users.revoke_refresh_token(&claims.jti).await {
        error!(error = %e, "Failed to revoke refresh token");
    }

    HttpResponse::NoContent().finish()
}

/// Profile of the authenticated user
#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "Current user", body = crate::model::user::UserProfile),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "User no longer exists")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Auth"
)]
pub async fn me(auth: AuthUser, state: web::Data<AppState>) -> actix_web::Result<HttpResponse> {
    match state.users.find_by_id(auth.user_id).await? {
        Some(user) => Ok(HttpResponse::Ok().json(user.profile())),
        None => Ok(HttpResponse::NotFound().json(json!({ "message": "User not found" }))),
    }
}
