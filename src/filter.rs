//! Dashboard search and filtering over the loaded contract list.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::models::Contract;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContractFilter {
    pub search: Option<String>,
    pub min_amount: Option<Decimal>,
    pub max_amount: Option<Decimal>,
    pub start_date: Option<NaiveDate>,
    /// Inclusive of the whole day
    pub end_date: Option<NaiveDate>,
}

impl ContractFilter {
    pub fn matches(&self, contract: &Contract) -> bool {
        self.matches_search(contract) && self.matches_amount(contract) && self.matches_date(contract)
    }

    fn matches_search(&self, contract: &Contract) -> bool {
        let Some(term) = self.search.as_deref().filter(|t| !t.is_empty()) else {
            return true;
        };
        let term = term.to_lowercase();
        [
            &contract.tad_project_number,
            &contract.contract_number,
            &contract.prime_contractor,
        ]
        .into_iter()
        .any(|field| field.to_lowercase().contains(&term))
    }

    fn matches_amount(&self, contract: &Contract) -> bool {
        self.min_amount.is_none_or(|min| contract.original_amount >= min)
            && self.max_amount.is_none_or(|max| contract.original_amount <= max)
    }

    fn matches_date(&self, contract: &Contract) -> bool {
        let created = contract.created_at.date_naive();
        self.start_date.is_none_or(|start| created >= start)
            && self.end_date.is_none_or(|end| created <= end)
    }
}

pub fn filter_contracts<'a>(contracts: &'a [Contract], filter: &ContractFilter) -> Vec<&'a Contract> {
    contracts.iter().filter(|c| filter.matches(c)).collect()
}

/// Raw filter values as they arrive in a query string; blanks mean unset.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContractFilterParams {
    pub search: Option<String>,
    pub min_amount: Option<String>,
    pub max_amount: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_amount(value: Option<String>, field: &str) -> Result<Option<Decimal>> {
    non_blank(value)
        .map(|v| {
            v.parse::<Decimal>()
                .map_err(|_| AppError::Validation(format!("{field} must be a number")))
        })
        .transpose()
}

fn parse_date(value: Option<String>, field: &str) -> Result<Option<NaiveDate>> {
    non_blank(value)
        .map(|v| {
            NaiveDate::parse_from_str(&v, "%Y-%m-%d")
                .map_err(|_| AppError::Validation(format!("{field} must be a YYYY-MM-DD date")))
        })
        .transpose()
}

impl TryFrom<ContractFilterParams> for ContractFilter {
    type Error = AppError;

    fn try_from(params: ContractFilterParams) -> Result<Self> {
        Ok(Self {
            search: non_blank(params.search),
            min_amount: parse_amount(params.min_amount, "min_amount")?,
            max_amount: parse_amount(params.max_amount, "max_amount")?,
            start_date: parse_date(params.start_date, "start_date")?,
            end_date: parse_date(params.end_date, "end_date")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn contract(project: &str, amount: Decimal, created: (i32, u32, u32)) -> Contract {
        let created = Utc
            .with_ymd_and_hms(created.0, created.1, created.2, 15, 30, 0)
            .unwrap();
        Contract {
            id: Uuid::new_v4(),
            tad_project_number: project.into(),
            contract_number: format!("CN-{project}"),
            prime_contractor: "Volunteer Builders".into(),
            original_amount: amount,
            dbe_percentage: dec!(0),
            final_report: false,
            award_date: None,
            report_date: None,
            created_at: created,
            updated_at: created,
            created_by: Uuid::nil(),
            subgrants: Vec::new(),
        }
    }

    fn projects(found: Vec<&Contract>) -> Vec<&str> {
        found.into_iter().map(|c| c.tad_project_number.as_str()).collect()
    }

    fn sample() -> Vec<Contract> {
        vec![
            contract("A1", dec!(100), (2024, 1, 1)),
            contract("B2", dec!(500), (2024, 6, 1)),
        ]
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn empty_filter_passes_everything() {
        let contracts = sample();
        assert_eq!(filter_contracts(&contracts, &ContractFilter::default()).len(), 2);
    }

    #[test]
    fn min_amount_excludes_smaller_contracts() {
        let contracts = sample();
        let filter = ContractFilter {
            min_amount: Some(dec!(200)),
            ..Default::default()
        };
        assert_eq!(projects(filter_contracts(&contracts, &filter)), ["B2"]);
    }

    #[test]
    fn amount_bounds_are_inclusive() {
        let contracts = sample();
        let filter = ContractFilter {
            min_amount: Some(dec!(100)),
            max_amount: Some(dec!(100)),
            ..Default::default()
        };
        assert_eq!(projects(filter_contracts(&contracts, &filter)), ["A1"]);
    }

    #[test]
    fn search_is_case_insensitive_across_fields() {
        let contracts = sample();
        let filter = ContractFilter {
            search: Some("a1".into()),
            ..Default::default()
        };
        assert_eq!(projects(filter_contracts(&contracts, &filter)), ["A1"]);

        let filter = ContractFilter {
            search: Some("VOLUNTEER".into()),
            ..Default::default()
        };
        assert_eq!(filter_contracts(&contracts, &filter).len(), 2);

        let filter = ContractFilter {
            search: Some("cn-b".into()),
            ..Default::default()
        };
        assert_eq!(projects(filter_contracts(&contracts, &filter)), ["B2"]);
    }

    #[test]
    fn start_date_excludes_earlier_contracts() {
        let contracts = sample();
        let filter = ContractFilter {
            start_date: Some(date(2024, 3, 1)),
            ..Default::default()
        };
        assert_eq!(projects(filter_contracts(&contracts, &filter)), ["B2"]);
    }

    #[test]
    fn end_date_includes_the_whole_day() {
        let contracts = sample();
        let filter = ContractFilter {
            start_date: Some(date(2024, 6, 1)),
            end_date: Some(date(2024, 6, 1)),
            ..Default::default()
        };
        assert_eq!(projects(filter_contracts(&contracts, &filter)), ["B2"]);
    }

    #[test]
    fn params_treat_blanks_as_unset() {
        let filter = ContractFilter::try_from(ContractFilterParams {
            search: Some("  ".into()),
            min_amount: Some(String::new()),
            max_amount: Some("250.5".into()),
            start_date: None,
            end_date: Some("2024-12-31".into()),
        })
        .unwrap();
        assert_eq!(
            filter,
            ContractFilter {
                max_amount: Some(dec!(250.5)),
                end_date: Some(date(2024, 12, 31)),
                ..Default::default()
            }
        );
    }

    #[test]
    fn params_reject_garbage() {
        let bad = ContractFilterParams {
            min_amount: Some("lots".into()),
            ..Default::default()
        };
        assert!(matches!(ContractFilter::try_from(bad), Err(AppError::Validation(_))));

        let bad = ContractFilterParams {
            start_date: Some("03/01/2024".into()),
            ..Default::default()
        };
        assert!(matches!(ContractFilter::try_from(bad), Err(AppError::Validation(_))));
    }
}
