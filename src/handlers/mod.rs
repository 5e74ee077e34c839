pub mod auth;
pub mod contracts;
pub mod extract;
pub mod reports;
pub mod subgrants;

pub use extract::AppJson;
