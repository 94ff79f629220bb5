#![allow(dead_code)]

use plan_link_verifier::infrastructure::persistence::PgPlanLinkRepository;
use sqlx::PgPool;
use std::sync::Arc;

pub async fn create_plan(pool: &PgPool, provider: &str, link: Option<&str>) -> i64 {
    sqlx::query_scalar(
        "INSERT INTO insurance_plans (provider, external_link) VALUES ($1, $2) RETURNING id",
    )
    .bind(provider)
    .bind(link)
    .fetch_one(pool)
    .await
    .unwrap()
}

pub async fn create_verified_plan(pool: &PgPool, provider: &str, link: &str, status: &str) -> i64 {
    sqlx::query_scalar(
        "INSERT INTO insurance_plans (provider, external_link, link_status, last_verified_at)
         VALUES ($1, $2, $3, NOW()) RETURNING id",
    )
    .bind(provider)
    .bind(link)
    .bind(status)
    .fetch_one(pool)
    .await
    .unwrap()
}

pub async fn stored_verdict(
    pool: &PgPool,
    id: i64,
) -> (Option<String>, Option<String>, Option<String>) {
    sqlx::query_as(
        "SELECT link_status, final_url, provider_official_domain FROM insurance_plans WHERE id = $1",
    )
    .bind(id)
    .fetch_one(pool)
    .await
    .unwrap()
}

pub async fn create_repository(pool: PgPool) -> PgPlanLinkRepository {
    PgPlanLinkRepository::connect(Arc::new(pool)).await.unwrap()
}
