pub mod contract;
pub mod ethnicity;
pub mod subgrant;
pub mod user;

pub use contract::{Contract, ContractInput, ContractPatch, ContractUpdate};
pub use ethnicity::{Ethnicity, EthnicityGender, Gender};
pub use subgrant::{ContractType, Subgrant, SubgrantEdit, SubgrantInput, SubgrantPatch};
pub use user::{Credentials, Role, Session, SessionInfo, SessionResponse, User, UserDto};
