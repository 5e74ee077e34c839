use axum::{
    extract::{Json, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    app::SharedState,
    error::{AppError, Result},
    report,
    services::auth_service::AuthUser,
};

/// `contract_ids` is a comma-separated list; absent or blank selects everything
#[derive(Debug, Default, Deserialize)]
pub struct ReportParams {
    pub contract_ids: Option<String>,
}

impl ReportParams {
    fn selection(&self) -> Result<Vec<Uuid>> {
        self.contract_ids
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(|id| {
                Uuid::parse_str(id)
                    .map_err(|_| AppError::Validation(format!("Invalid contract id: {id}")))
            })
            .collect()
    }
}

pub async fn dbe_report(
    State(state): State<SharedState>,
    _user: AuthUser,
    Query(params): Query<ReportParams>,
) -> Result<impl IntoResponse> {
    let selection = params.selection()?;
    let contracts = state.contracts.list().await?;
    let dbe = report::build_report(&contracts, &selection);

    tracing::debug!(
        "Built DBE report over {} of {} contracts",
        dbe.contract_count,
        contracts.len()
    );
    Ok((StatusCode::OK, Json(dbe)))
}

pub async fn ethnicity_gender_summary(
    State(state): State<SharedState>,
    _user: AuthUser,
) -> Result<impl IntoResponse> {
    let contracts = state.contracts.list().await?;
    Ok((StatusCode::OK, Json(report::ethnicity_gender_summary(&contracts))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selection_parses_comma_separated_ids() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let params = ReportParams {
            contract_ids: Some(format!("{a}, {b},")),
        };
        assert_eq!(params.selection().unwrap(), vec![a, b]);
        assert!(ReportParams::default().selection().unwrap().is_empty());

        let bad = ReportParams {
            contract_ids: Some("nope".into()),
        };
        assert!(matches!(bad.selection(), Err(AppError::Validation(_))));
    }
}
