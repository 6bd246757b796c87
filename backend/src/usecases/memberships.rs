use std::sync::Arc;

use crates::domain::{
    repositories::{catalog::CatalogRepository, memberships::MembershipRepository},
    value_objects::memberships::{MembershipDetailDto, allowance_for},
};
use uuid::Uuid;

use super::errors::{EngineError, EngineResult};

pub struct MembershipQueryUseCase<M, C>
where
    M: MembershipRepository + Send + Sync + 'static,
    C: CatalogRepository + Send + Sync + 'static,
{
    membership_repo: Arc<M>,
    catalog_repo: Arc<C>,
}

impl<M, C> MembershipQueryUseCase<M, C>
where
    M: MembershipRepository + Send + Sync + 'static,
    C: CatalogRepository + Send + Sync + 'static,
{
    pub fn new(membership_repo: Arc<M>, catalog_repo: Arc<C>) -> Self {
        Self {
            membership_repo,
            catalog_repo,
        }
    }

    pub async fn get_membership(&self, membership_id: Uuid) -> EngineResult<MembershipDetailDto> {
        let membership = self
            .membership_repo
            .find_by_id(membership_id)
            .await?
            .ok_or(EngineError::not_found("membership", membership_id))?;

        let plan = self
            .catalog_repo
            .find_plan(membership.plan_id)
            .await?
            .ok_or(EngineError::not_found("plan", membership.plan_id))?;

        let histories = self
            .membership_repo
            .list_freeze_histories(membership_id)
            .await?;
        let allowance = allowance_for(&membership, plan.max_freeze_days, &histories);

        Ok(MembershipDetailDto {
            membership: membership.into(),
            freeze_histories: histories.into_iter().map(Into::into).collect(),
            max_freeze_days: plan.max_freeze_days,
            remaining_freeze_days: allowance.remaining(),
        })
    }
}
