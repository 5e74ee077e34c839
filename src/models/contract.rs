use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::subgrant::{Subgrant, SubgrantEdit};

/// Prime contract with its DBE subgrants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contract {
    pub id: Uuid,
    pub tad_project_number: String,
    pub contract_number: String,
    pub prime_contractor: String,
    pub original_amount: Decimal,
    /// DBE goal, 0 to 100
    pub dbe_percentage: Decimal,
    pub final_report: bool,
    pub award_date: Option<NaiveDate>,
    pub report_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: Uuid,
    #[serde(default)]
    pub subgrants: Vec<Subgrant>,
}

impl Contract {
    pub fn certified_subgrants(&self) -> impl Iterator<Item = &Subgrant> {
        self.subgrants.iter().filter(|s| s.certified_dbe)
    }
}

/// Fields submitted when creating or fully replacing a contract
#[derive(Debug, Clone, Deserialize)]
pub struct ContractInput {
    pub tad_project_number: String,
    pub contract_number: String,
    pub prime_contractor: String,
    pub original_amount: Decimal,
    #[serde(default)]
    pub dbe_percentage: Decimal,
    #[serde(default)]
    pub final_report: bool,
    pub award_date: NaiveDate,
    pub report_date: NaiveDate,
}

/// Partial contract update, e.g. toggling `final_report`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContractPatch {
    pub tad_project_number: Option<String>,
    pub contract_number: Option<String>,
    pub prime_contractor: Option<String>,
    pub original_amount: Option<Decimal>,
    pub dbe_percentage: Option<Decimal>,
    pub final_report: Option<bool>,
    pub award_date: Option<NaiveDate>,
    pub report_date: Option<NaiveDate>,
}

/// Body of the edit-contract flow: the contract fields plus any subgrant rows
/// edited in the same form.
#[derive(Debug, Clone, Deserialize)]
pub struct ContractUpdate {
    #[serde(flatten)]
    pub contract: ContractInput,
    #[serde(default)]
    pub subgrants: Vec<SubgrantEdit>,
}

fn required(value: String, field: &str) -> Result<String> {
    let value = value.trim().to_string();
    if value.is_empty() {
        return Err(AppError::Validation(format!("{field} is required")));
    }
    Ok(value)
}

impl ContractInput {
    /// Check every field and return the input with strings trimmed.
    pub fn validated(self) -> Result<Self> {
        if self.original_amount < Decimal::ZERO {
            return Err(AppError::Validation(
                "Original amount must not be negative".into(),
            ));
        }
        if self.dbe_percentage < Decimal::ZERO || self.dbe_percentage > Decimal::ONE_HUNDRED {
            return Err(AppError::Validation(
                "DBE percentage must be between 0 and 100".into(),
            ));
        }
        Ok(Self {
            tad_project_number: required(self.tad_project_number, "TAD project number")?,
            contract_number: required(self.contract_number, "Contract number")?,
            prime_contractor: required(self.prime_contractor, "Prime contractor")?,
            ..self
        })
    }
}

impl ContractPatch {
    /// Apply the patch over an existing contract, producing a full input.
    pub fn apply_to(self, current: &Contract) -> Result<ContractInput> {
        let (Some(award_date), Some(report_date)) = (
            self.award_date.or(current.award_date),
            self.report_date.or(current.report_date),
        ) else {
            return Err(AppError::Validation(
                "Award date and report date are required".into(),
            ));
        };

        ContractInput {
            tad_project_number: self
                .tad_project_number
                .unwrap_or_else(|| current.tad_project_number.clone()),
            contract_number: self
                .contract_number
                .unwrap_or_else(|| current.contract_number.clone()),
            prime_contractor: self
                .prime_contractor
                .unwrap_or_else(|| current.prime_contractor.clone()),
            original_amount: self.original_amount.unwrap_or(current.original_amount),
            dbe_percentage: self.dbe_percentage.unwrap_or(current.dbe_percentage),
            final_report: self.final_report.unwrap_or(current.final_report),
            award_date,
            report_date,
        }
        .validated()
    }
}
