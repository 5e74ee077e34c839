use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::ethnicity::EthnicityGender;

/// Kind of work the DBE firm performs under the prime contract
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
pub enum ContractType {
    Subcontract,
    Supplier,
    Manufacturer,
}

/// Subgrant awarded to a DBE firm under a contract
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subgrant {
    pub id: Uuid,
    pub contract_id: Uuid,
    pub dbe_firm_name: String,
    pub naics_code: String,
    pub amount: Decimal,
    pub contract_type: ContractType,
    pub certified_dbe: bool,
    pub award_date: Option<NaiveDate>,
    /// Stored category; may hold an unmigrated legacy value.
    pub ethnicity_gender: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: Uuid,
}

/// Fields submitted when creating or fully replacing a subgrant
#[derive(Debug, Clone, Deserialize)]
pub struct SubgrantInput {
    pub dbe_firm_name: String,
    pub naics_code: String,
    pub amount: Decimal,
    pub contract_type: ContractType,
    #[serde(default)]
    pub certified_dbe: bool,
    pub award_date: NaiveDate,
    #[serde(default)]
    pub ethnicity_gender: Option<String>,
}

/// Single-field or partial subgrant update
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubgrantPatch {
    pub dbe_firm_name: Option<String>,
    pub naics_code: Option<String>,
    pub amount: Option<Decimal>,
    pub contract_type: Option<ContractType>,
    pub certified_dbe: Option<bool>,
    pub award_date: Option<NaiveDate>,
    /// `Some(None)` clears the category, `None` leaves it untouched.
    #[serde(default, deserialize_with = "present")]
    pub ethnicity_gender: Option<Option<String>>,
}

/// A subgrant replacement carried by the edit-contract flow
#[derive(Debug, Clone, Deserialize)]
pub struct SubgrantEdit {
    pub id: Uuid,
    #[serde(flatten)]
    pub fields: SubgrantInput,
}

fn present<'de, D>(deserializer: D) -> std::result::Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

/// A NAICS industry code is exactly six ASCII digits.
pub fn is_valid_naics_code(code: &str) -> bool {
    code.len() == 6 && code.bytes().all(|b| b.is_ascii_digit())
}

pub fn validate_naics_code(code: &str) -> Result<()> {
    if is_valid_naics_code(code) {
        Ok(())
    } else {
        Err(AppError::Validation(
            "NAICS code must be exactly 6 digits".to_string(),
        ))
    }
}

/// Normalise a submitted category to its canonical spelling. Blank means none.
pub fn normalize_ethnicity_gender(value: Option<&str>) -> Result<Option<String>> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value
            .parse::<EthnicityGender>()
            .map(|category| Some(category.to_string()))
            .map_err(|e| AppError::Validation(e.to_string())),
    }
}

impl SubgrantInput {
    /// Check every field and return the input with its category normalised.
    pub fn validated(mut self) -> Result<Self> {
        self.dbe_firm_name = self.dbe_firm_name.trim().to_string();
        if self.dbe_firm_name.is_empty() {
            return Err(AppError::Validation("DBE firm name is required".into()));
        }
        validate_naics_code(&self.naics_code)?;
        if self.amount < Decimal::ZERO {
            return Err(AppError::Validation("Amount must not be negative".into()));
        }
        self.ethnicity_gender = normalize_ethnicity_gender(self.ethnicity_gender.as_deref())?;
        Ok(self)
    }
}

impl SubgrantPatch {
    /// Apply the patch over an existing subgrant, producing a full input.
    ///
    /// The stored category is only re-checked when the patch replaces it, so
    /// rows still holding an unmigrated value can have other fields edited.
    pub fn apply_to(self, current: &Subgrant) -> Result<SubgrantInput> {
        let award_date = match self.award_date.or(current.award_date) {
            Some(date) => date,
            None => return Err(AppError::Validation("Award date is required".into())),
        };
        let replaces_category = self.ethnicity_gender.is_some();
        let mut input = SubgrantInput {
            dbe_firm_name: self.dbe_firm_name.unwrap_or_else(|| current.dbe_firm_name.clone()),
            naics_code: self.naics_code.unwrap_or_else(|| current.naics_code.clone()),
            amount: self.amount.unwrap_or(current.amount),
            contract_type: self.contract_type.unwrap_or(current.contract_type),
            certified_dbe: self.certified_dbe.unwrap_or(current.certified_dbe),
            award_date,
            ethnicity_gender: self.ethnicity_gender.flatten(),
        }
        .validated()?;

        if !replaces_category {
            input.ethnicity_gender = current.ethnicity_gender.clone();
        }
        Ok(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn input() -> SubgrantInput {
        SubgrantInput {
            dbe_firm_name: "Acme Paving".into(),
            naics_code: "237310".into(),
            amount: dec!(12000),
            contract_type: ContractType::Subcontract,
            certified_dbe: true,
            award_date: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
            ethnicity_gender: Some("black american/female".into()),
        }
    }

    #[test]
    fn naics_code_must_be_six_digits() {
        assert!(is_valid_naics_code("012345"));
        assert!(!is_valid_naics_code("12345"));
        assert!(!is_valid_naics_code("1234567"));
        assert!(!is_valid_naics_code("12a456"));
        assert!(!is_valid_naics_code("１２３４５６"));
    }

    #[test]
    fn validated_normalises_category() {
        let input = input().validated().unwrap();
        assert_eq!(input.ethnicity_gender.as_deref(), Some("Black American/Female"));
    }

    #[test]
    fn validated_rejects_bad_fields() {
        let mut bad = input();
        bad.naics_code = "12a456".into();
        assert!(matches!(bad.validated(), Err(AppError::Validation(_))));

        let mut bad = input();
        bad.amount = dec!(-1);
        assert!(matches!(bad.validated(), Err(AppError::Validation(_))));

        let mut bad = input();
        bad.ethnicity_gender = Some("MBE-BA".into());
        assert!(matches!(bad.validated(), Err(AppError::Validation(_))));

        let mut blank = input();
        blank.ethnicity_gender = Some("  ".into());
        assert_eq!(blank.validated().unwrap().ethnicity_gender, None);
    }

    #[test]
    fn patch_distinguishes_null_from_absent_category() {
        let untouched: SubgrantPatch = serde_json::from_str(r#"{"certified_dbe": false}"#).unwrap();
        assert_eq!(untouched.ethnicity_gender, None);

        let cleared: SubgrantPatch = serde_json::from_str(r#"{"ethnicity_gender": null}"#).unwrap();
        assert_eq!(cleared.ethnicity_gender, Some(None));
    }

    fn stored(category: Option<&str>) -> Subgrant {
        let now = Utc::now();
        let input = input();
        Subgrant {
            id: Uuid::new_v4(),
            contract_id: Uuid::new_v4(),
            dbe_firm_name: input.dbe_firm_name,
            naics_code: input.naics_code,
            amount: input.amount,
            contract_type: input.contract_type,
            certified_dbe: false,
            award_date: Some(input.award_date),
            ethnicity_gender: category.map(str::to_string),
            created_at: now,
            updated_at: now,
            created_by: Uuid::new_v4(),
        }
    }

    #[test]
    fn patch_keeps_an_unrecognised_stored_category() {
        let current = stored(Some("DBE-ZZ"));
        let patch = SubgrantPatch {
            certified_dbe: Some(true),
            ..Default::default()
        };
        let input = patch.apply_to(&current).unwrap();
        assert!(input.certified_dbe);
        assert_eq!(input.ethnicity_gender.as_deref(), Some("DBE-ZZ"));
    }

    #[test]
    fn patch_checks_a_replacement_category() {
        let current = stored(Some("DBE-ZZ"));

        let bad = SubgrantPatch {
            ethnicity_gender: Some(Some("MBE-BA".into())),
            ..Default::default()
        };
        assert!(matches!(bad.apply_to(&current), Err(AppError::Validation(_))));

        let good = SubgrantPatch {
            ethnicity_gender: Some(Some("hispanic american/male".into())),
            ..Default::default()
        };
        assert_eq!(
            good.apply_to(&current).unwrap().ethnicity_gender.as_deref(),
            Some("Hispanic American/Male")
        );

        let cleared = SubgrantPatch {
            ethnicity_gender: Some(None),
            ..Default::default()
        };
        assert_eq!(cleared.apply_to(&current).unwrap().ethnicity_gender, None);
    }
}
