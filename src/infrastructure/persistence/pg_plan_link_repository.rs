//! PostgreSQL implementation of the plan link repository.

use async_trait::async_trait;
use serde_json::json;
use sqlx::{PgPool, Row};
use std::sync::Arc;
use tracing::debug;

use crate::domain::entities::{LinkStatus, PlanLinkRecord, VerificationVerdict};
use crate::domain::repositories::{
    CandidateFilter, PlanLinkRepository, ProviderMatch, StatusCount,
};
use crate::error::AppError;

/// Table holding the plans and their verdict columns.
pub const PLANS_TABLE: &str = "insurance_plans";

/// Verdict columns written by the verifier.
pub const VERDICT_COLUMNS: [&str; 4] = [
    "link_status",
    "final_url",
    "last_verified_at",
    "provider_official_domain",
];

/// Column metadata as reported by `information_schema`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    pub name: String,
    pub data_type: String,
    pub nullable: bool,
}

/// PostgreSQL repository over `insurance_plans`.
///
/// Queries are built at runtime so the crate compiles without a live
/// database; all values are bound, never interpolated.
pub struct PgPlanLinkRepository {
    pool: Arc<PgPool>,
    records_official_domain: bool,
}

impl PgPlanLinkRepository {
    /// Creates a repository that does not write `provider_official_domain`.
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self {
            pool,
            records_official_domain: false,
        }
    }

    /// Creates a repository, checking once whether the optional
    /// `provider_official_domain` column exists.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Database`] if the schema cannot be inspected.
    pub async fn connect(pool: Arc<PgPool>) -> Result<Self, AppError> {
        let columns = verdict_columns(&pool).await?;
        let records_official_domain = columns
            .iter()
            .any(|c| c.name == "provider_official_domain");

        debug!(
            records_official_domain,
            "inspected {} verdict columns",
            columns.len()
        );

        Ok(Self {
            pool,
            records_official_domain,
        })
    }

    /// Whether verdict writes include `provider_official_domain`.
    pub fn records_official_domain(&self) -> bool {
        self.records_official_domain
    }

    /// Adds any missing verdict column, then returns the verdict columns present.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Database`] if the table is missing or the
    /// `ALTER TABLE` fails.
    pub async fn ensure_columns(&self) -> Result<Vec<ColumnInfo>, AppError> {
        sqlx::query(
            r#"
            ALTER TABLE insurance_plans
                ADD COLUMN IF NOT EXISTS link_status TEXT
                    CHECK (link_status IN ('valid', 'redirected', 'broken')),
                ADD COLUMN IF NOT EXISTS final_url TEXT,
                ADD COLUMN IF NOT EXISTS last_verified_at TIMESTAMPTZ,
                ADD COLUMN IF NOT EXISTS provider_official_domain TEXT
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        verdict_columns(&self.pool).await
    }

    /// Number of rows in the plans table; used as a connectivity check.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Database`] if the table cannot be read.
    pub async fn count_plans(&self) -> Result<i64, AppError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM insurance_plans")
            .fetch_one(self.pool.as_ref())
            .await?;

        Ok(total)
    }
}

/// Lists the verdict columns that exist on the plans table.
///
/// # Errors
///
/// Returns [`AppError::Database`] on database errors.
pub async fn verdict_columns(pool: &PgPool) -> Result<Vec<ColumnInfo>, AppError> {
    let rows = sqlx::query(
        r#"
        SELECT column_name::text AS column_name,
               data_type::text AS data_type,
               is_nullable::text AS is_nullable
        FROM information_schema.columns
        WHERE table_schema = current_schema()
          AND table_name = $1
          AND column_name = ANY($2)
        ORDER BY column_name
        "#,
    )
    .bind(PLANS_TABLE)
    .bind(&VERDICT_COLUMNS[..])
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|row| -> Result<ColumnInfo, sqlx::Error> {
            let nullable: String = row.try_get("is_nullable")?;
            Ok(ColumnInfo {
                name: row.try_get("column_name")?,
                data_type: row.try_get("data_type")?,
                nullable: nullable.eq_ignore_ascii_case("YES"),
            })
        })
        .collect::<Result<Vec<_>, sqlx::Error>>()
        .map_err(AppError::from)
}

fn parse_status(raw: Option<String>) -> Result<Option<LinkStatus>, AppError> {
    raw.map(|s| {
        s.parse::<LinkStatus>().map_err(|e| {
            AppError::internal(
                "Unexpected link_status value",
                json!({ "value": s, "reason": e }),
            )
        })
    })
    .transpose()
}

#[async_trait]
impl PlanLinkRepository for PgPlanLinkRepository {
    async fn fetch_candidates(
        &self,
        filter: CandidateFilter,
    ) -> Result<Vec<PlanLinkRecord>, AppError> {
        let rows = sqlx::query(
            r#"
            SELECT id::bigint AS id,
                   COALESCE(provider, '') AS provider,
                   external_link
            FROM insurance_plans
            WHERE external_link IS NOT NULL
              AND btrim(external_link) <> ''
              AND ($1::boolean IS FALSE OR link_status IS NULL)
              AND ($2::text IS NULL OR provider ILIKE $2 ESCAPE '\')
            ORDER BY id
            LIMIT $3
            "#,
        )
        .bind(filter.only_unverified)
        .bind(filter.provider_pattern())
        .bind(filter.limit)
        .fetch_all(self.pool.as_ref())
        .await?;

        let records = rows
            .into_iter()
            .map(|row| -> Result<PlanLinkRecord, sqlx::Error> {
                Ok(PlanLinkRecord::new(
                    row.try_get("id")?,
                    row.try_get("provider")?,
                    row.try_get("external_link")?,
                ))
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()?;

        Ok(records)
    }

    async fn save_verdict(
        &self,
        verdict: VerificationVerdict,
        official_domain: Option<String>,
    ) -> Result<(), AppError> {
        let result = if self.records_official_domain {
            sqlx::query(
                r#"
                UPDATE insurance_plans
                SET link_status = $1,
                    final_url = $2,
                    last_verified_at = $3,
                    provider_official_domain = $4
                WHERE id = $5
                "#,
            )
            .bind(verdict.status.as_str())
            .bind(&verdict.final_url)
            .bind(verdict.checked_at)
            .bind(&official_domain)
            .bind(verdict.plan_id)
            .execute(self.pool.as_ref())
            .await?
        } else {
            sqlx::query(
                r#"
                UPDATE insurance_plans
                SET link_status = $1,
                    final_url = $2,
                    last_verified_at = $3
                WHERE id = $4
                "#,
            )
            .bind(verdict.status.as_str())
            .bind(&verdict.final_url)
            .bind(verdict.checked_at)
            .bind(verdict.plan_id)
            .execute(self.pool.as_ref())
            .await?
        };

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(
                "Plan not found",
                json!({ "plan_id": verdict.plan_id }),
            ));
        }

        Ok(())
    }

    async fn status_counts(&self, provider: Option<String>) -> Result<Vec<StatusCount>, AppError> {
        let pattern = CandidateFilter::new(0)
            .with_provider(provider, ProviderMatch::Partial)
            .provider_pattern();

        let rows = sqlx::query(
            r#"
            SELECT link_status, COUNT(*) AS total
            FROM insurance_plans
            WHERE external_link IS NOT NULL
              AND btrim(external_link) <> ''
              AND ($1::text IS NULL OR provider ILIKE $1 ESCAPE '\')
            GROUP BY link_status
            ORDER BY link_status NULLS LAST
            "#,
        )
        .bind(pattern)
        .fetch_all(self.pool.as_ref())
        .await?;

        rows.into_iter()
            .map(|row| -> Result<StatusCount, AppError> {
                Ok(StatusCount {
                    status: parse_status(row.try_get("link_status")?)?,
                    count: row.try_get("total")?,
                })
            })
            .collect()
    }

    async fn reset_verdicts(&self, provider: Option<String>) -> Result<u64, AppError> {
        let pattern = CandidateFilter::new(0)
            .with_provider(provider, ProviderMatch::Partial)
            .provider_pattern();

        let result = sqlx::query(
            r#"
            UPDATE insurance_plans
            SET link_status = NULL,
                final_url = NULL,
                last_verified_at = NULL
            WHERE link_status IS NOT NULL
              AND ($1::text IS NULL OR provider ILIKE $1 ESCAPE '\')
            "#,
        )
        .bind(pattern)
        .execute(self.pool.as_ref())
        .await?;

        Ok(result.rows_affected())
    }
}
