use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, Sqlite};
use uuid::Uuid;

use crate::{
    db::{DbPool, parse_decimal},
    error::{AppError, Result},
    models::{ContractType, Subgrant, SubgrantInput},
};

#[derive(Debug, FromRow)]
struct SubgrantRow {
    id: Uuid,
    contract_id: Uuid,
    dbe_firm_name: String,
    naics_code: String,
    amount: String,
    contract_type: ContractType,
    certified_dbe: bool,
    award_date: Option<NaiveDate>,
    ethnicity_gender: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    created_by: Uuid,
}

impl TryFrom<SubgrantRow> for Subgrant {
    type Error = AppError;

    fn try_from(row: SubgrantRow) -> Result<Self> {
        Ok(Self {
            amount: parse_decimal(&row.amount, "subgrants.amount")?,
            id: row.id,
            contract_id: row.contract_id,
            dbe_firm_name: row.dbe_firm_name,
            naics_code: row.naics_code,
            contract_type: row.contract_type,
            certified_dbe: row.certified_dbe,
            award_date: row.award_date,
            ethnicity_gender: row.ethnicity_gender,
            created_at: row.created_at,
            updated_at: row.updated_at,
            created_by: row.created_by,
        })
    }
}

/// Replace every editable column of one subgrant belonging to `contract_id`.
/// Returns the number of rows touched.
pub(crate) async fn update_row<'e, E>(
    executor: E,
    id: Uuid,
    contract_id: Uuid,
    input: &SubgrantInput,
    now: DateTime<Utc>,
) -> Result<u64>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        r#"
        UPDATE subgrants
        SET dbe_firm_name = ?, naics_code = ?, amount = ?, contract_type = ?,
            certified_dbe = ?, award_date = ?, ethnicity_gender = ?, updated_at = ?
        WHERE id = ? AND contract_id = ?
        "#,
    )
    .bind(&input.dbe_firm_name)
    .bind(&input.naics_code)
    .bind(input.amount.to_string())
    .bind(input.contract_type)
    .bind(input.certified_dbe)
    .bind(input.award_date)
    .bind(&input.ethnicity_gender)
    .bind(now)
    .bind(id)
    .bind(contract_id)
    .execute(executor)
    .await
    .map_err(AppError::Database)?;

    Ok(result.rows_affected())
}

/// Subgrant store for database operations
#[derive(Clone)]
pub struct SubgrantStore {
    pool: DbPool,
}

impl SubgrantStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// All subgrants grouped by their contract id, oldest first
    pub async fn all_by_contract(&self) -> Result<HashMap<Uuid, Vec<Subgrant>>> {
        let rows = sqlx::query_as::<_, SubgrantRow>(
            "SELECT * FROM subgrants ORDER BY created_at ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::Database)?;

        let mut grouped: HashMap<Uuid, Vec<Subgrant>> = HashMap::new();
        for row in rows {
            let subgrant = Subgrant::try_from(row)?;
            grouped.entry(subgrant.contract_id).or_default().push(subgrant);
        }
        Ok(grouped)
    }

    pub async fn list_for_contract(&self, contract_id: Uuid) -> Result<Vec<Subgrant>> {
        sqlx::query_as::<_, SubgrantRow>(
            "SELECT * FROM subgrants WHERE contract_id = ? ORDER BY created_at ASC",
        )
        .bind(contract_id)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::Database)?
        .into_iter()
        .map(Subgrant::try_from)
        .collect()
    }

    pub async fn get(&self, id: Uuid) -> Result<Subgrant> {
        let row = sqlx::query_as::<_, SubgrantRow>("SELECT * FROM subgrants WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)?
            .ok_or_else(|| AppError::NotFound("Subgrant".into()))?;

        Subgrant::try_from(row)
    }

    /// Insert a validated subgrant under an existing contract
    pub async fn insert(
        &self,
        contract_id: Uuid,
        input: &SubgrantInput,
        created_by: Uuid,
    ) -> Result<Subgrant> {
        let parent: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM contracts WHERE id = ?")
            .bind(contract_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)?;
        if parent.is_none() {
            return Err(AppError::NotFound("Contract".into()));
        }

        let id = Uuid::new_v4();
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO subgrants (
                id, contract_id, dbe_firm_name, naics_code, amount, contract_type,
                certified_dbe, award_date, ethnicity_gender, created_at, updated_at, created_by
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(id)
        .bind(contract_id)
        .bind(&input.dbe_firm_name)
        .bind(&input.naics_code)
        .bind(input.amount.to_string())
        .bind(input.contract_type)
        .bind(input.certified_dbe)
        .bind(input.award_date)
        .bind(&input.ethnicity_gender)
        .bind(now)
        .bind(now)
        .bind(created_by)
        .execute(&self.pool)
        .await
        .map_err(AppError::Database)?;

        tracing::info!("Created subgrant {} under contract {}", id, contract_id);
        self.get(id).await
    }

    /// Replace a subgrant's fields
    pub async fn update(&self, current: &Subgrant, input: &SubgrantInput) -> Result<Subgrant> {
        let touched = update_row(&self.pool, current.id, current.contract_id, input, Utc::now()).await?;
        if touched == 0 {
            return Err(AppError::NotFound("Subgrant".into()));
        }
        self.get(current.id).await
    }

    /// Delete a subgrant by ID
    pub async fn delete(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM subgrants WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(AppError::Database)?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Subgrant".into()));
        }
        tracing::info!("Deleted subgrant {}", id);
        Ok(())
    }
}
