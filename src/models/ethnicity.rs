//! Ethnicity/gender categories for DBE firm ownership.
//!
//! The canonical encoding is `"<Ethnicity>/<Gender>"`, e.g.
//! `"Black American/Female"`. Older records used coded categories such as
//! `"MBE-BA"` or `"WFBE"`; those are only ever converted through
//! [`EthnicityGender::from_legacy_code`], never accepted as canonical input.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Separator between the ethnicity and gender halves of a category.
pub const CATEGORY_SEPARATOR: char = '/';

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Ethnicity {
    #[serde(rename = "Black American")]
    BlackAmerican,
    #[serde(rename = "Hispanic American")]
    HispanicAmerican,
    #[serde(rename = "Native American")]
    NativeAmerican,
    #[serde(rename = "Asian-Pacific American")]
    AsianPacificAmerican,
    #[serde(rename = "Subcontinent Asian American")]
    SubcontinentAsianAmerican,
    #[serde(rename = "Non-Minority")]
    NonMinority,
}

impl Ethnicity {
    pub const ALL: [Ethnicity; 6] = [
        Ethnicity::BlackAmerican,
        Ethnicity::HispanicAmerican,
        Ethnicity::NativeAmerican,
        Ethnicity::AsianPacificAmerican,
        Ethnicity::SubcontinentAsianAmerican,
        Ethnicity::NonMinority,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Ethnicity::BlackAmerican => "Black American",
            Ethnicity::HispanicAmerican => "Hispanic American",
            Ethnicity::NativeAmerican => "Native American",
            Ethnicity::AsianPacificAmerican => "Asian-Pacific American",
            Ethnicity::SubcontinentAsianAmerican => "Subcontinent Asian American",
            Ethnicity::NonMinority => "Non-Minority",
        }
    }

    /// Case-insensitive lookup by display name.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        Self::ALL
            .into_iter()
            .find(|ethnicity| ethnicity.as_str().eq_ignore_ascii_case(value))
    }
}

impl fmt::Display for Ethnicity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gender {
    Female,
    Male,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Female => "Female",
            Gender::Male => "Male",
        }
    }

    /// Report classification: anything that is not a female encoding counts as men.
    pub fn classify(value: &str) -> Self {
        const FEMALE: [&str; 4] = ["female", "f", "woman", "women"];
        let value = value.trim();
        if FEMALE.iter().any(|f| f.eq_ignore_ascii_case(value)) {
            Gender::Female
        } else {
            Gender::Male
        }
    }

    fn parse_strict(value: &str) -> Option<Self> {
        let value = value.trim();
        if value.eq_ignore_ascii_case("female") {
            Some(Gender::Female)
        } else if value.eq_ignore_ascii_case("male") {
            Some(Gender::Male)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EthnicityGender {
    pub ethnicity: Ethnicity,
    pub gender: Gender,
}

#[derive(Debug, thiserror::Error, PartialEq)]
#[error("unknown ethnicity/gender category: {0:?}")]
pub struct ParseCategoryError(pub String);

/// Coded categories found in older records, with the canonical pair each one
/// migrates to. `MBE-*` codes denote minority male-owned firms, `WMBE-*`
/// minority women-owned firms, and `WFBE` non-minority women-owned firms.
pub const LEGACY_CODES: [(&str, Ethnicity, Gender); 11] = [
    ("MBE-BA", Ethnicity::BlackAmerican, Gender::Male),
    ("MBE-HA", Ethnicity::HispanicAmerican, Gender::Male),
    ("MBE-NA", Ethnicity::NativeAmerican, Gender::Male),
    ("MBE-APA", Ethnicity::AsianPacificAmerican, Gender::Male),
    ("MBE-SAA", Ethnicity::SubcontinentAsianAmerican, Gender::Male),
    ("WMBE-BA", Ethnicity::BlackAmerican, Gender::Female),
    ("WMBE-HA", Ethnicity::HispanicAmerican, Gender::Female),
    ("WMBE-NA", Ethnicity::NativeAmerican, Gender::Female),
    ("WMBE-APA", Ethnicity::AsianPacificAmerican, Gender::Female),
    ("WMBE-SAA", Ethnicity::SubcontinentAsianAmerican, Gender::Female),
    ("WFBE", Ethnicity::NonMinority, Gender::Female),
];

impl EthnicityGender {
    pub fn new(ethnicity: Ethnicity, gender: Gender) -> Self {
        Self { ethnicity, gender }
    }

    pub fn from_legacy_code(code: &str) -> Option<Self> {
        let code = code.trim();
        LEGACY_CODES
            .iter()
            .find(|(legacy, _, _)| legacy.eq_ignore_ascii_case(code))
            .map(|&(_, ethnicity, gender)| Self::new(ethnicity, gender))
    }

    /// Lenient split used by reports: the ethnicity must be known, the gender
    /// half is classified rather than validated.
    pub fn classify(category: &str) -> Option<Self> {
        let (ethnicity, gender) = category.split_once(CATEGORY_SEPARATOR)?;
        Some(Self::new(Ethnicity::parse(ethnicity)?, Gender::classify(gender)))
    }
}

impl FromStr for EthnicityGender {
    type Err = ParseCategoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseCategoryError(s.to_string());
        let (ethnicity, gender) = s.split_once(CATEGORY_SEPARATOR).ok_or_else(err)?;
        Ok(Self::new(
            Ethnicity::parse(ethnicity).ok_or_else(err)?,
            Gender::parse_strict(gender).ok_or_else(err)?,
        ))
    }
}

impl fmt::Display for EthnicityGender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}",
            self.ethnicity.as_str(),
            CATEGORY_SEPARATOR,
            self.gender.as_str()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_categories_parse_case_insensitively() {
        let parsed: EthnicityGender = "black american/FEMALE".parse().unwrap();
        assert_eq!(parsed, EthnicityGender::new(Ethnicity::BlackAmerican, Gender::Female));
        assert_eq!(parsed.to_string(), "Black American/Female");
    }

    #[test]
    fn strict_parse_rejects_legacy_and_partial_values() {
        assert!("MBE-BA".parse::<EthnicityGender>().is_err());
        assert!("Black American".parse::<EthnicityGender>().is_err());
        assert!("Martian/Female".parse::<EthnicityGender>().is_err());
        assert!("Black American/F".parse::<EthnicityGender>().is_err());
    }

    #[test]
    fn classify_treats_non_female_as_men() {
        let c = EthnicityGender::classify("Native American/unknown").unwrap();
        assert_eq!(c.gender, Gender::Male);
        let c = EthnicityGender::classify("Native American/f").unwrap();
        assert_eq!(c.gender, Gender::Female);
        assert!(EthnicityGender::classify("Martian/Female").is_none());
        assert!(EthnicityGender::classify("WFBE").is_none());
    }

    #[test]
    fn legacy_codes_map_to_canonical_pairs() {
        assert_eq!(
            EthnicityGender::from_legacy_code("MBE-BA").map(|c| c.to_string()),
            Some("Black American/Male".to_string())
        );
        assert_eq!(
            EthnicityGender::from_legacy_code("wfbe").map(|c| c.to_string()),
            Some("Non-Minority/Female".to_string())
        );
        assert_eq!(EthnicityGender::from_legacy_code("DBE-XX"), None);
    }
}
