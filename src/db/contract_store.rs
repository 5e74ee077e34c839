use chrono::{DateTime, NaiveDate, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use crate::{
    db::{DbPool, SubgrantStore, parse_decimal, subgrant_store},
    error::{AppError, Result},
    models::{Contract, ContractInput, SubgrantEdit},
};

#[derive(Debug, FromRow)]
struct ContractRow {
    id: Uuid,
    tad_project_number: String,
    contract_number: String,
    prime_contractor: String,
    original_amount: String,
    dbe_percentage: String,
    final_report: bool,
    award_date: Option<NaiveDate>,
    report_date: Option<NaiveDate>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    created_by: Uuid,
}

impl TryFrom<ContractRow> for Contract {
    type Error = AppError;

    fn try_from(row: ContractRow) -> Result<Self> {
        Ok(Self {
            original_amount: parse_decimal(&row.original_amount, "contracts.original_amount")?,
            dbe_percentage: parse_decimal(&row.dbe_percentage, "contracts.dbe_percentage")?,
            id: row.id,
            tad_project_number: row.tad_project_number,
            contract_number: row.contract_number,
            prime_contractor: row.prime_contractor,
            final_report: row.final_report,
            award_date: row.award_date,
            report_date: row.report_date,
            created_at: row.created_at,
            updated_at: row.updated_at,
            created_by: row.created_by,
            subgrants: Vec::new(),
        })
    }
}

/// Contract store for database operations
#[derive(Clone)]
pub struct ContractStore {
    pool: DbPool,
    subgrants: SubgrantStore,
}

impl ContractStore {
    /// Create a new ContractStore with the provided database pool
    pub fn new(pool: DbPool) -> Self {
        Self {
            subgrants: SubgrantStore::new(pool.clone()),
            pool,
        }
    }

    /// Every contract with its subgrants, newest first
    pub async fn list(&self) -> Result<Vec<Contract>> {
        let rows = sqlx::query_as::<_, ContractRow>(
            "SELECT * FROM contracts ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::Database)?;

        let mut subgrants = self.subgrants.all_by_contract().await?;

        rows.into_iter()
            .map(|row| -> Result<Contract> {
                let mut contract = Contract::try_from(row)?;
                contract.subgrants = subgrants.remove(&contract.id).unwrap_or_default();
                Ok(contract)
            })
            .collect()
    }

    /// Get a contract and its subgrants by ID
    pub async fn get(&self, id: Uuid) -> Result<Contract> {
        let row = sqlx::query_as::<_, ContractRow>("SELECT * FROM contracts WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)?
            .ok_or_else(|| AppError::NotFound("Contract".into()))?;

        let mut contract = Contract::try_from(row)?;
        contract.subgrants = self.subgrants.list_for_contract(id).await?;
        Ok(contract)
    }

    /// Insert a validated contract
    pub async fn insert(&self, input: &ContractInput, created_by: Uuid) -> Result<Contract> {
        let id = Uuid::new_v4();
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO contracts (
                id, tad_project_number, contract_number, prime_contractor, original_amount,
                dbe_percentage, final_report, award_date, report_date, created_at, updated_at, created_by
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(id)
        .bind(&input.tad_project_number)
        .bind(&input.contract_number)
        .bind(&input.prime_contractor)
        .bind(input.original_amount.to_string())
        .bind(input.dbe_percentage.to_string())
        .bind(input.final_report)
        .bind(input.award_date)
        .bind(input.report_date)
        .bind(now)
        .bind(now)
        .bind(created_by)
        .execute(&self.pool)
        .await
        .map_err(AppError::Database)?;

        tracing::info!("Created contract {} ({})", id, input.contract_number);
        self.get(id).await
    }

    /// Replace a contract's fields together with any subgrant edits.
    ///
    /// Runs in one transaction: if any subgrant row is missing or fails to
    /// update, the contract row is left untouched as well.
    pub async fn update(
        &self,
        id: Uuid,
        input: &ContractInput,
        edits: &[SubgrantEdit],
    ) -> Result<Contract> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;

        let result = sqlx::query(
            r#"
            UPDATE contracts
            SET tad_project_number = ?, contract_number = ?, prime_contractor = ?,
                original_amount = ?, dbe_percentage = ?, final_report = ?,
                award_date = ?, report_date = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&input.tad_project_number)
        .bind(&input.contract_number)
        .bind(&input.prime_contractor)
        .bind(input.original_amount.to_string())
        .bind(input.dbe_percentage.to_string())
        .bind(input.final_report)
        .bind(input.award_date)
        .bind(input.report_date)
        .bind(now)
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(AppError::Database)?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Contract".into()));
        }

        for edit in edits {
            let touched = subgrant_store::update_row(&mut *tx, edit.id, id, &edit.fields, now).await?;
            if touched == 0 {
                tracing::warn!("Subgrant {} is not part of contract {}, rolling back", edit.id, id);
                return Err(AppError::NotFound(format!("Subgrant {}", edit.id)));
            }
        }

        tx.commit().await.map_err(AppError::Database)?;

        tracing::info!("Updated contract {} with {} subgrant edits", id, edits.len());
        self.get(id).await
    }

    /// Delete a contract by ID; its subgrants go with it
    pub async fn delete(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM contracts WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(AppError::Database)?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Contract".into()));
        }
        tracing::info!("Deleted contract {}", id);
        Ok(())
    }
}
