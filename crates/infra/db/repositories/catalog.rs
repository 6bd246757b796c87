use anyhow::Result;
use async_trait::async_trait;
use diesel::prelude::*;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain,
    infra::db::postgres::{
        postgres_connection::{PgPoolSquad, checkout},
        schema::{branch_settings, plans},
    },
};
use domain::{
    entities::plans::{BranchSettingsEntity, PlanEntity},
    repositories::catalog::CatalogRepository,
};

pub struct CatalogPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl CatalogPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl CatalogRepository for CatalogPostgres {
    async fn find_plan(&self, plan_id: Uuid) -> Result<Option<PlanEntity>> {
        let mut conn = checkout(&self.db_pool)?;

        let plan = plans::table
            .find(plan_id)
            .select(PlanEntity::as_select())
            .first::<PlanEntity>(&mut conn)
            .optional()?;

        Ok(plan)
    }

    async fn find_branch_settings(&self, branch_id: Uuid) -> Result<Option<BranchSettingsEntity>> {
        let mut conn = checkout(&self.db_pool)?;

        let settings = branch_settings::table
            .find(branch_id)
            .select(BranchSettingsEntity::as_select())
            .first::<BranchSettingsEntity>(&mut conn)
            .optional()?;

        Ok(settings)
    }
}
