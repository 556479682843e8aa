use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{AuthResponse, ChangePasswordRequest, LoginRequest, MessageResponse, SignupRequest},
        jwt::{AuthUser, JwtKeys},
        password::{hash_password, verify_password},
    },
    domain::{is_password_too_short, is_valid_email, PublicUser},
    error::{ApiJson, AppError, AppResult},
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
        .route("/auth/password", put(change_password))
        .route("/auth/me", get(get_me))
}

#[instrument(skip(state, payload))]
pub async fn signup(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<SignupRequest>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    let email = payload.email.trim();

    if !is_valid_email(email) {
        warn!(email = %email, "invalid email");
        return Err(AppError::Validation("Invalid email".into()));
    }
    if is_password_too_short(&payload.password) {
        warn!("password too short");
        return Err(AppError::WeakPassword);
    }

    if state.users.find_by_email(email).await?.is_some() {
        warn!(email = %email, "email already registered");
        return Err(AppError::DuplicateEmail);
    }

    let hash = hash_password(&payload.password)?;
    let full_name = payload
        .full_name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty());

    let user = state
        .users
        .create_user(email, &hash, full_name)
        .await?
        .ok_or_else(|| {
            warn!(email = %email, "email registered concurrently");
            AppError::DuplicateEmail
        })?;

    let token = JwtKeys::from_ref(&state).sign(user.id)?;

    info!(user_id = %user.id, "user signed up");
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            token,
            user: PublicUser::from(&user),
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let email = payload.email.trim();

    // Unknown email and wrong password must be indistinguishable to the caller.
    let Some(user) = state.users.find_by_email(email).await? else {
        warn!("login unknown email");
        return Err(AppError::InvalidCredentials);
    };

    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(AppError::InvalidCredentials);
    }

    let token = JwtKeys::from_ref(&state).sign(user.id)?;

    info!(user_id = %user.id, "user logged in");
    Ok(Json(AuthResponse {
        token,
        user: PublicUser::from(&user),
    }))
}

#[instrument(skip(state, payload))]
pub async fn change_password(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ApiJson(payload): ApiJson<ChangePasswordRequest>,
) -> AppResult<Json<MessageResponse>> {
    if is_password_too_short(&payload.password) {
        warn!(user_id = %user_id, "new password too short");
        return Err(AppError::WeakPassword);
    }

    let hash = hash_password(&payload.password)?;
    if !state.users.update_password(user_id, &hash).await? {
        warn!(user_id = %user_id, "password change for missing user");
        return Err(AppError::UserNotFound);
    }

    info!(user_id = %user_id, "password changed");
    Ok(Json(MessageResponse {
        message: "Password updated".into(),
    }))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<PublicUser>> {
    let user = state.users.find_by_id(user_id).await?.ok_or_else(|| {
        warn!(user_id = %user_id, "token for missing user");
        AppError::Unauthorized("User not found".into())
    })?;
    Ok(Json(PublicUser::from(&user)))
}
