use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::entities::plans::{BranchSettingsEntity, PlanEntity};

#[automock]
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    async fn find_plan(&self, plan_id: Uuid) -> Result<Option<PlanEntity>>;

    async fn find_branch_settings(&self, branch_id: Uuid) -> Result<Option<BranchSettingsEntity>>;
}
