use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::{
    config::Config,
    db::{ContractStore, DbPool, SubgrantStore},
    handlers::{auth, contracts, reports, subgrants},
    services::AuthService,
};

/// Response header carrying the current contract list revision
pub const LIST_REVISION_HEADER: &str = "x-list-revision";

/// Counter bumped after every successful contract or subgrant write.
///
/// A client holding a list fetched at an older revision must re-read it;
/// lists are never patched in place.
#[derive(Debug, Default)]
pub struct ListRevision(AtomicU64);

impl ListRevision {
    pub fn current(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }

    pub fn bump(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn header(&self) -> [(&'static str, String); 1] {
        [(LIST_REVISION_HEADER, self.current().to_string())]
    }
}

pub struct AppState {
    pub contracts: ContractStore,
    pub subgrants: SubgrantStore,
    pub auth: AuthService,
    pub revision: ListRevision,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(pool: DbPool, config: &Config) -> Self {
        Self {
            contracts: ContractStore::new(pool.clone()),
            subgrants: SubgrantStore::new(pool.clone()),
            auth: AuthService::new(pool, config.jwt_secret.clone(), config.jwt_expiration_hours),
            revision: ListRevision::default(),
        }
    }
}

async fn health() -> &'static str {
    "DBE tracker server is running."
}

pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(health))
        // Auth
        .route("/api/auth/sign-up", post(auth::sign_up))
        .route("/api/auth/sign-in", post(auth::sign_in))
        .route("/api/auth/sign-out", post(auth::sign_out))
        .route("/api/auth/session", get(auth::get_session))
        .route("/api/auth/user", get(auth::get_current_user))
        // Contracts
        .route(
            "/api/contracts",
            get(contracts::list_contracts).post(contracts::create_contract),
        )
        .route(
            "/api/contracts/{id}",
            get(contracts::get_contract)
                .put(contracts::update_contract)
                .patch(contracts::patch_contract)
                .delete(contracts::delete_contract),
        )
        .route(
            "/api/contracts/{id}/subgrants",
            post(subgrants::create_subgrant),
        )
        // Subgrants
        .route(
            "/api/subgrants/{id}",
            axum::routing::put(subgrants::update_subgrant)
                .patch(subgrants::patch_subgrant)
                .delete(subgrants::delete_subgrant),
        )
        // Reports
        .route("/api/reports", get(reports::dbe_report))
        .route(
            "/api/reports/ethnicity-gender",
            get(reports::ethnicity_gender_summary),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
