use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use crate::{
    app::SharedState,
    error::{AppError, Result},
    handlers::extract::AppJson,
    models::{Subgrant, SubgrantInput, SubgrantPatch},
    services::auth_service::AuthUser,
};

async fn load_for_write(state: &SharedState, user: &AuthUser, id: Uuid) -> Result<Subgrant> {
    let subgrant = state.subgrants.get(id).await?;
    if !user.can_modify(subgrant.created_by) {
        tracing::warn!("User {} may not modify subgrant {}", user.user_id, id);
        return Err(AppError::Forbidden(
            "Only the creator or an admin can modify this subgrant".into(),
        ));
    }
    Ok(subgrant)
}

/// Attach a subgrant to a contract; the NAICS code is checked before any store call
pub async fn create_subgrant(
    State(state): State<SharedState>,
    user: AuthUser,
    Path(contract_id): Path<Uuid>,
    AppJson(input): AppJson<SubgrantInput>,
) -> Result<impl IntoResponse> {
    let input = input.validated()?;
    let subgrant = state.subgrants.insert(contract_id, &input, user.user_id).await?;
    state.revision.bump();
    Ok((StatusCode::CREATED, state.revision.header(), Json(subgrant)))
}

pub async fn update_subgrant(
    State(state): State<SharedState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    AppJson(input): AppJson<SubgrantInput>,
) -> Result<impl IntoResponse> {
    let input = input.validated()?;
    let current = load_for_write(&state, &user, id).await?;
    let subgrant = state.subgrants.update(&current, &input).await?;
    state.revision.bump();
    Ok((StatusCode::OK, state.revision.header(), Json(subgrant)))
}

/// Partial update, e.g. toggling `certified_dbe`
pub async fn patch_subgrant(
    State(state): State<SharedState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    AppJson(patch): AppJson<SubgrantPatch>,
) -> Result<impl IntoResponse> {
    let current = load_for_write(&state, &user, id).await?;
    let input = patch.apply_to(&current)?;
    let subgrant = state.subgrants.update(&current, &input).await?;
    state.revision.bump();
    Ok((StatusCode::OK, state.revision.header(), Json(subgrant)))
}

pub async fn delete_subgrant(
    State(state): State<SharedState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    load_for_write(&state, &user, id).await?;
    state.subgrants.delete(id).await?;
    state.revision.bump();
    Ok((StatusCode::NO_CONTENT, state.revision.header()))
}
