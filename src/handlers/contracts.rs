use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use crate::{
    app::SharedState,
    error::{AppError, Result},
    filter::{ContractFilter, ContractFilterParams, filter_contracts},
    handlers::extract::AppJson,
    models::{Contract, ContractInput, ContractPatch, ContractUpdate, SubgrantEdit},
    services::auth_service::AuthUser,
};

/// Load a contract and make sure the caller may change it
async fn load_for_write(state: &SharedState, user: &AuthUser, id: Uuid) -> Result<Contract> {
    let contract = state.contracts.get(id).await?;
    if !user.can_modify(contract.created_by) {
        tracing::warn!("User {} may not modify contract {}", user.user_id, id);
        return Err(AppError::Forbidden(
            "Only the creator or an admin can modify this contract".into(),
        ));
    }
    Ok(contract)
}

/// Dashboard listing with optional search and filters
pub async fn list_contracts(
    State(state): State<SharedState>,
    _user: AuthUser,
    Query(params): Query<ContractFilterParams>,
) -> Result<impl IntoResponse> {
    let filter = ContractFilter::try_from(params)?;
    // Read the revision first so a concurrent write can only make it look stale
    let revision = state.revision.header();
    let contracts = state.contracts.list().await?;
    let matching: Vec<Contract> = filter_contracts(&contracts, &filter)
        .into_iter()
        .cloned()
        .collect();
    Ok((StatusCode::OK, revision, Json(matching)))
}

pub async fn get_contract(
    State(state): State<SharedState>,
    _user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let contract = state.contracts.get(id).await?;
    Ok((StatusCode::OK, Json(contract)))
}

pub async fn create_contract(
    State(state): State<SharedState>,
    user: AuthUser,
    AppJson(input): AppJson<ContractInput>,
) -> Result<impl IntoResponse> {
    let input = input.validated()?;
    let contract = state.contracts.insert(&input, user.user_id).await?;
    state.revision.bump();
    Ok((StatusCode::CREATED, state.revision.header(), Json(contract)))
}

/// Edit-contract flow: contract fields and subgrant edits in one transaction
pub async fn update_contract(
    State(state): State<SharedState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    AppJson(update): AppJson<ContractUpdate>,
) -> Result<impl IntoResponse> {
    let input = update.contract.validated()?;
    let edits = update
        .subgrants
        .into_iter()
        .map(|mut edit| -> Result<SubgrantEdit> {
            edit.fields = edit.fields.validated()?;
            Ok(edit)
        })
        .collect::<Result<Vec<_>>>()?;

    load_for_write(&state, &user, id).await?;
    let contract = state.contracts.update(id, &input, &edits).await?;
    state.revision.bump();
    Ok((StatusCode::OK, state.revision.header(), Json(contract)))
}

/// Partial update, e.g. toggling `final_report`
pub async fn patch_contract(
    State(state): State<SharedState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    AppJson(patch): AppJson<ContractPatch>,
) -> Result<impl IntoResponse> {
    let current = load_for_write(&state, &user, id).await?;
    let input = patch.apply_to(&current)?;
    let contract = state.contracts.update(id, &input, &[]).await?;
    state.revision.bump();
    Ok((StatusCode::OK, state.revision.header(), Json(contract)))
}

pub async fn delete_contract(
    State(state): State<SharedState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    load_for_write(&state, &user, id).await?;
    state.contracts.delete(id).await?;
    state.revision.bump();
    Ok((StatusCode::NO_CONTENT, state.revision.header()))
}
