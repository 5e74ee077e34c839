//! DBE participation report.
//!
//! Everything here is a pure function over contracts that were already loaded
//! with their subgrants. Missing or unrecognised optional fields never fail a
//! report: a certified subgrant without a known ethnicity/gender category still
//! counts in the totals, it is just left out of the breakdown.

use std::collections::BTreeMap;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use uuid::Uuid;

use crate::models::{Contract, Ethnicity, EthnicityGender, Gender};

/// `numerator / denominator` as a percentage rounded to two places, or zero
/// when the denominator is zero.
pub fn percentage(numerator: Decimal, denominator: Decimal) -> Decimal {
    if denominator.is_zero() {
        return Decimal::ZERO;
    }
    (numerator / denominator * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Contracts picked by `selection`; an empty selection means all of them.
pub fn select<'a>(
    contracts: &'a [Contract],
    selection: &'a [Uuid],
) -> impl Iterator<Item = &'a Contract> + 'a {
    contracts
        .iter()
        .filter(move |contract| selection.is_empty() || selection.contains(&contract.id))
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Tally {
    pub count: u64,
    pub amount: Decimal,
}

impl Tally {
    fn add(&mut self, amount: Decimal) {
        self.count += 1;
        self.amount += amount;
    }

    fn merge(&mut self, other: &Tally) {
        self.count += other.count;
        self.amount += other.amount;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TotalsRow {
    pub count: u64,
    pub amount: Decimal,
    pub dbe_count: u64,
    pub dbe_amount: Decimal,
}

/// Prime contract and certified subcontract award totals.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AwardTotals {
    /// The prime row never carries a DBE amount.
    pub prime: TotalsRow,
    pub subcontracts: TotalsRow,
    /// Certified subcontract dollars as a share of prime dollars.
    pub dbe_percent: Decimal,
}

pub fn award_totals(contracts: &[Contract], selection: &[Uuid]) -> AwardTotals {
    let mut prime = TotalsRow::default();
    let mut certified = Tally::default();

    for contract in select(contracts, selection) {
        prime.count += 1;
        prime.amount += contract.original_amount;
        for subgrant in contract.certified_subgrants() {
            certified.add(subgrant.amount);
        }
    }

    AwardTotals {
        dbe_percent: percentage(certified.amount, prime.amount),
        prime,
        subcontracts: TotalsRow {
            count: certified.count,
            amount: certified.amount,
            dbe_count: certified.count,
            dbe_amount: certified.amount,
        },
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct GenderSplit {
    pub women: Tally,
    pub men: Tally,
    pub total: Tally,
}

impl GenderSplit {
    fn add(&mut self, gender: Gender, amount: Decimal) {
        match gender {
            Gender::Female => self.women.add(amount),
            Gender::Male => self.men.add(amount),
        }
        self.total.add(amount);
    }

    fn merge(&mut self, other: &GenderSplit) {
        self.women.merge(&other.women);
        self.men.merge(&other.men);
        self.total.merge(&other.total);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EthnicityBreakdown {
    /// Every ethnicity is present, zeroed when no subgrant falls into it.
    pub buckets: BTreeMap<Ethnicity, GenderSplit>,
    pub total: GenderSplit,
}

impl Default for EthnicityBreakdown {
    fn default() -> Self {
        Self {
            buckets: Ethnicity::ALL
                .into_iter()
                .map(|ethnicity| (ethnicity, GenderSplit::default()))
                .collect(),
            total: GenderSplit::default(),
        }
    }
}

impl EthnicityBreakdown {
    pub fn bucket(&self, ethnicity: Ethnicity) -> GenderSplit {
        self.buckets.get(&ethnicity).copied().unwrap_or_default()
    }
}

pub fn ethnicity_breakdown(contracts: &[Contract], selection: &[Uuid]) -> EthnicityBreakdown {
    let mut breakdown = EthnicityBreakdown::default();

    let tagged = select(contracts, selection)
        .flat_map(|contract| contract.certified_subgrants())
        .filter_map(|subgrant| {
            let category = subgrant.ethnicity_gender.as_deref()?;
            let parsed = EthnicityGender::classify(category);
            if parsed.is_none() {
                tracing::trace!(subgrant = %subgrant.id, category, "category left out of breakdown");
            }
            parsed.map(|category| (category, subgrant.amount))
        });

    for (category, amount) in tagged {
        breakdown
            .buckets
            .entry(category.ethnicity)
            .or_default()
            .add(category.gender, amount);
    }

    let mut total = GenderSplit::default();
    for split in breakdown.buckets.values() {
        total.merge(split);
    }
    breakdown.total = total;
    breakdown
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OngoingPayments {
    pub count: u64,
    pub amount: Decimal,
    pub dbe: Tally,
    pub dbe_percent: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CompletedRow {
    pub count: u64,
    pub amount: Decimal,
    /// Dollar goal implied by the DBE percentage
    pub dbe_needed: Decimal,
    pub dbe_participation: Decimal,
    pub dbe_percent: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CompletedPayments {
    /// Contracts closed out with a DBE goal above zero
    pub race_conscious: CompletedRow,
    /// Contracts closed out with no DBE goal
    pub race_neutral: CompletedRow,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PaymentsByStatus {
    pub ongoing: OngoingPayments,
    pub completed: CompletedPayments,
}

pub fn payments_by_status(contracts: &[Contract], selection: &[Uuid]) -> PaymentsByStatus {
    let mut payments = PaymentsByStatus::default();

    for contract in select(contracts, selection) {
        if contract.final_report {
            let row = if contract.dbe_percentage > Decimal::ZERO {
                &mut payments.completed.race_conscious
            } else {
                &mut payments.completed.race_neutral
            };
            row.count += 1;
            row.amount += contract.original_amount;
            row.dbe_needed +=
                contract.dbe_percentage / Decimal::ONE_HUNDRED * contract.original_amount;
            row.dbe_participation += contract
                .certified_subgrants()
                .map(|s| s.amount)
                .sum::<Decimal>();
        } else {
            let ongoing = &mut payments.ongoing;
            ongoing.count += 1;
            ongoing.amount += contract.original_amount;
            for subgrant in contract.certified_subgrants() {
                ongoing.dbe.add(subgrant.amount);
            }
        }
    }

    let ongoing = &mut payments.ongoing;
    ongoing.dbe_percent = percentage(ongoing.dbe.amount, ongoing.amount);
    for row in [
        &mut payments.completed.race_conscious,
        &mut payments.completed.race_neutral,
    ] {
        row.dbe_percent = percentage(row.dbe_participation, row.amount);
    }

    payments
}

/// The full compliance report for a selection of contracts.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DbeReport {
    pub contract_count: u64,
    pub award_totals: AwardTotals,
    pub ethnicity_breakdown: EthnicityBreakdown,
    pub payments: PaymentsByStatus,
}

pub fn build_report(contracts: &[Contract], selection: &[Uuid]) -> DbeReport {
    let award_totals = award_totals(contracts, selection);
    DbeReport {
        contract_count: award_totals.prime.count,
        award_totals,
        ethnicity_breakdown: ethnicity_breakdown(contracts, selection),
        payments: payments_by_status(contracts, selection),
    }
}

/// Per-contract subgrant totals for one ethnicity/gender category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContractCategoryRow {
    pub contract_id: Uuid,
    pub tad_project_number: String,
    pub contract_number: String,
    pub prime_contractor: String,
    pub original_amount: Decimal,
    pub dbe_percentage: Decimal,
    pub ethnicity_gender: String,
    pub subgrant_count: u64,
    pub total_amount: Decimal,
}

/// One row per contract and distinct stored category, in contract order then
/// category order. Subgrants without a category are skipped.
pub fn ethnicity_gender_summary(contracts: &[Contract]) -> Vec<ContractCategoryRow> {
    let mut rows = Vec::new();
    for contract in contracts {
        let mut by_category: BTreeMap<&str, Tally> = BTreeMap::new();
        for subgrant in &contract.subgrants {
            if let Some(category) = subgrant.ethnicity_gender.as_deref() {
                by_category.entry(category).or_default().add(subgrant.amount);
            }
        }
        rows.extend(by_category.into_iter().map(|(category, tally)| ContractCategoryRow {
            contract_id: contract.id,
            tad_project_number: contract.tad_project_number.clone(),
            contract_number: contract.contract_number.clone(),
            prime_contractor: contract.prime_contractor.clone(),
            original_amount: contract.original_amount,
            dbe_percentage: contract.dbe_percentage,
            ethnicity_gender: category.to_string(),
            subgrant_count: tally.count,
            total_amount: tally.amount,
        }));
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ContractType, Subgrant};
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn contract(amount: Decimal, pct: Decimal, final_report: bool) -> Contract {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        Contract {
            id: Uuid::new_v4(),
            tad_project_number: "TAD-1".into(),
            contract_number: "C-1".into(),
            prime_contractor: "Prime".into(),
            original_amount: amount,
            dbe_percentage: pct,
            final_report,
            award_date: None,
            report_date: None,
            created_at: now,
            updated_at: now,
            created_by: Uuid::nil(),
            subgrants: Vec::new(),
        }
    }

    fn subgrant(contract: &mut Contract, amount: Decimal, certified: bool, category: Option<&str>) {
        contract.subgrants.push(Subgrant {
            id: Uuid::new_v4(),
            contract_id: contract.id,
            dbe_firm_name: "Firm".into(),
            naics_code: "237310".into(),
            amount,
            contract_type: ContractType::Subcontract,
            certified_dbe: certified,
            award_date: None,
            ethnicity_gender: category.map(str::to_string),
            created_at: contract.created_at,
            updated_at: contract.created_at,
            created_by: Uuid::nil(),
        });
    }

    fn sample() -> Vec<Contract> {
        let mut a = contract(dec!(100000), dec!(10), true);
        subgrant(&mut a, dec!(12000), true, Some("Black American/Female"));
        subgrant(&mut a, dec!(3000), false, Some("Black American/Male"));

        let mut b = contract(dec!(50000), dec!(0), true);
        subgrant(&mut b, dec!(5000), true, Some("Hispanic American/Male"));
        subgrant(&mut b, dec!(700), true, None);

        let mut c = contract(dec!(20000), dec!(5), false);
        subgrant(&mut c, dec!(1000), true, Some("Non-Minority/female"));
        subgrant(&mut c, dec!(400), true, Some("WFBE"));

        vec![a, b, c]
    }

    #[test]
    fn percentage_is_zero_for_zero_denominator() {
        assert_eq!(percentage(Decimal::ZERO, Decimal::ZERO), Decimal::ZERO);
        assert_eq!(percentage(dec!(42), Decimal::ZERO), Decimal::ZERO);
        assert_eq!(percentage(dec!(1), dec!(3)), dec!(33.33));
        assert_eq!(percentage(dec!(2), dec!(3)), dec!(66.67));
    }

    #[test]
    fn empty_selection_matches_selecting_everything() {
        let contracts = sample();
        let all: Vec<Uuid> = contracts.iter().map(|c| c.id).collect();
        assert_eq!(build_report(&contracts, &[]), build_report(&contracts, &all));
    }

    #[test]
    fn empty_input_yields_zeroed_report() {
        let report = build_report(&[], &[]);
        assert_eq!(report.contract_count, 0);
        assert_eq!(report.award_totals, AwardTotals::default());
        assert_eq!(report.ethnicity_breakdown.buckets.len(), Ethnicity::ALL.len());
        assert_eq!(report.ethnicity_breakdown.total, GenderSplit::default());
        assert_eq!(report.payments, PaymentsByStatus::default());
    }

    #[test]
    fn award_totals_sum_prime_and_certified_amounts() {
        let contracts = sample();
        let totals = award_totals(&contracts, &[]);
        assert_eq!(totals.prime.count, 3);
        assert_eq!(totals.prime.amount, dec!(170000));
        assert_eq!(totals.prime.dbe_amount, Decimal::ZERO);
        assert_eq!(totals.subcontracts.count, 5);
        assert_eq!(totals.subcontracts.amount, dec!(19100));
        assert_eq!(totals.subcontracts.dbe_amount, dec!(19100));
        assert_eq!(totals.dbe_percent, dec!(11.24));
    }

    #[test]
    fn selection_restricts_contracts_and_ignores_unknown_ids() {
        let contracts = sample();
        let selection = [contracts[1].id, Uuid::new_v4()];
        let totals = award_totals(&contracts, &selection);
        assert_eq!(totals.prime.count, 1);
        assert_eq!(totals.prime.amount, dec!(50000));
        assert_eq!(totals.subcontracts.amount, dec!(5700));
    }

    #[test]
    fn uncertified_subgrants_never_count() {
        let mut only = contract(dec!(1000), dec!(5), false);
        subgrant(&mut only, dec!(900), false, Some("Black American/Female"));
        let report = build_report(&[only], &[]);
        assert_eq!(report.award_totals.subcontracts, TotalsRow::default());
        assert_eq!(report.ethnicity_breakdown.total, GenderSplit::default());
        assert_eq!(report.payments.ongoing.dbe, Tally::default());
    }

    #[test]
    fn breakdown_places_each_tagged_amount_in_one_bucket() {
        let contracts = sample();
        let breakdown = ethnicity_breakdown(&contracts, &[]);

        let black = breakdown.bucket(Ethnicity::BlackAmerican);
        assert_eq!(black.women, Tally { count: 1, amount: dec!(12000) });
        assert_eq!(black.men, Tally::default());

        let hispanic = breakdown.bucket(Ethnicity::HispanicAmerican);
        assert_eq!(hispanic.men, Tally { count: 1, amount: dec!(5000) });

        let non_minority = breakdown.bucket(Ethnicity::NonMinority);
        assert_eq!(non_minority.women, Tally { count: 1, amount: dec!(1000) });

        // the untagged 700 and the unmapped "WFBE" 400 are left out
        assert_eq!(breakdown.total.total, Tally { count: 3, amount: dec!(18000) });
        let bucket_sum: Decimal = breakdown.buckets.values().map(|s| s.total.amount).sum();
        assert_eq!(bucket_sum, breakdown.total.total.amount);
    }

    #[test]
    fn payments_split_by_status_and_goal() {
        let contracts = sample();
        let payments = payments_by_status(&contracts, &[]);

        assert_eq!(payments.ongoing.count, 1);
        assert_eq!(payments.ongoing.amount, dec!(20000));
        assert_eq!(payments.ongoing.dbe, Tally { count: 2, amount: dec!(1400) });
        assert_eq!(payments.ongoing.dbe_percent, dec!(7.00));

        let conscious = &payments.completed.race_conscious;
        assert_eq!(conscious.count, 1);
        assert_eq!(conscious.dbe_needed, dec!(10000));
        assert_eq!(conscious.dbe_participation, dec!(12000));

        let neutral = &payments.completed.race_neutral;
        assert_eq!(neutral.count, 1);
        assert_eq!(neutral.amount, dec!(50000));
        assert_eq!(neutral.dbe_needed, Decimal::ZERO);
        assert_eq!(neutral.dbe_participation, dec!(5700));
        assert_eq!(neutral.dbe_percent, dec!(11.40));
    }

    #[test]
    fn single_closed_out_contract_scenario() {
        let mut only = contract(dec!(100000), dec!(10), true);
        subgrant(&mut only, dec!(12000), true, Some("Black American/Female"));
        let report = build_report(&[only], &[]);

        let conscious = &report.payments.completed.race_conscious;
        assert_eq!(conscious.count, 1);
        assert_eq!(conscious.amount, dec!(100000));
        assert_eq!(conscious.dbe_needed, dec!(10000));
        assert_eq!(conscious.dbe_participation, dec!(12000));
        assert_eq!(conscious.dbe_percent, dec!(12.00));

        let black = report.ethnicity_breakdown.bucket(Ethnicity::BlackAmerican);
        assert_eq!(black.women, Tally { count: 1, amount: dec!(12000) });
    }

    #[test]
    fn summary_groups_categories_per_contract() {
        let contracts = sample();
        let rows = ethnicity_gender_summary(&contracts);
        let categories: Vec<&str> = rows.iter().map(|r| r.ethnicity_gender.as_str()).collect();
        assert_eq!(
            categories,
            [
                "Black American/Female",
                "Black American/Male",
                "Hispanic American/Male",
                "Non-Minority/female",
                "WFBE",
            ]
        );
        assert_eq!(rows[0].contract_id, contracts[0].id);
        assert_eq!(rows[0].subgrant_count, 1);
        assert_eq!(rows[0].total_amount, dec!(12000));
    }

    #[test]
    fn breakdown_serializes_with_display_names() {
        let value = serde_json::to_value(ethnicity_breakdown(&sample(), &[])).unwrap();
        assert_eq!(value["buckets"]["Black American"]["women"]["amount"], "12000");
        assert_eq!(value["buckets"]["Black American"]["women"]["count"], 1);
    }
}
