// src/db/tenancy_repo.rs

use sqlx::{Executor, PgPool, Postgres};

use crate::{
    common::error::AppError,
    models::tenancy::{Organization, PlanTier},
};

const ORGANIZATION_COLUMNS: &str = r#"
    id, name, slug, is_active,
    evolution_api_url, evolution_api_key, evolution_instance,
    openai_api_key, webhook_secret, google_calendar_id,
    plan_type, created_at
"#;

#[derive(Clone)]
pub struct OrganizationRepository {
    pool: PgPool,
}

impl OrganizationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Busca a clínica pelo slug da URL do webhook.
    pub async fn find_by_slug(&self, slug: &str) -> Result<Option<Organization>, AppError> {
        let query = format!("SELECT {} FROM organizations WHERE slug = $1", ORGANIZATION_COLUMNS);

        let org = sqlx::query_as::<_, Organization>(&query)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;

        Ok(org)
    }

    pub async fn update_plan<'e, E>(
        &self,
        executor: E,
        slug: &str,
        plan: PlanTier,
    ) -> Result<Option<Organization>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let query = format!(
            "UPDATE organizations SET plan_type = $2 WHERE slug = $1 RETURNING {}",
            ORGANIZATION_COLUMNS
        );

        let org = sqlx::query_as::<_, Organization>(&query)
            .bind(slug)
            .bind(plan.as_str())
            .fetch_optional(executor)
            .await?;

        Ok(org)
    }

    pub async fn set_active<'e, E>(
        &self,
        executor: E,
        slug: &str,
        active: bool,
    ) -> Result<Option<Organization>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let query = format!(
            "UPDATE organizations SET is_active = $2 WHERE slug = $1 RETURNING {}",
            ORGANIZATION_COLUMNS
        );

        let org = sqlx::query_as::<_, Organization>(&query)
            .bind(slug)
            .bind(active)
            .fetch_optional(executor)
            .await?;

        Ok(org)
    }
}
