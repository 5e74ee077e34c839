use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::{
    app::SharedState,
    error::Result,
    handlers::extract::AppJson,
    models::user::Credentials,
    services::auth_service::AuthUser,
};

/// Handler for account creation
pub async fn sign_up(
    State(state): State<SharedState>,
    AppJson(credentials): AppJson<Credentials>,
) -> Result<impl IntoResponse> {
    let user = state
        .auth
        .sign_up(&credentials.email, &credentials.password)
        .await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// Handler for email/password sign-in
pub async fn sign_in(
    State(state): State<SharedState>,
    AppJson(credentials): AppJson<Credentials>,
) -> Result<impl IntoResponse> {
    let session = state
        .auth
        .sign_in(&credentials.email, &credentials.password)
        .await?;
    Ok((StatusCode::OK, Json(session)))
}

/// Handler revoking the caller's session
pub async fn sign_out(State(state): State<SharedState>, user: AuthUser) -> Result<impl IntoResponse> {
    state.auth.sign_out(&user).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_session(State(state): State<SharedState>, user: AuthUser) -> Result<impl IntoResponse> {
    let session = state.auth.session_info(&user).await?;
    Ok((StatusCode::OK, Json(session)))
}

pub async fn get_current_user(
    State(state): State<SharedState>,
    user: AuthUser,
) -> Result<impl IntoResponse> {
    let account = state.auth.current_user(&user).await?;
    Ok((StatusCode::OK, Json(account)))
}
