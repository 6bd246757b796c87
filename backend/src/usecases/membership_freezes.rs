use std::sync::Arc;

use anyhow::anyhow;
use crates::domain::{
    clock::Clock,
    entities::{freeze_histories::InsertFreezeHistoryEntity, memberships::MembershipEntity},
    repositories::{
        catalog::CatalogRepository, domain_events::DomainEventPublisher,
        freezes::FreezeRepository, memberships::MembershipRepository,
    },
    value_objects::{
        approvals::{ApprovalPayload, FreezePayload, new_approval_request},
        cancellations::normalize_reason,
        domain_events::DomainEvent,
        enums::{freeze_statuses::FreezeStatus, membership_statuses::MembershipStatus},
        freezes::{FreezeRejection, find_overlap, quote_freeze, quote_resume},
        membership_transitions::{InvalidTransition, MembershipTransition},
        memberships::{
            FreezeReservation, FreezeSubmissionDto, MembershipDto, ReservationOutcome,
            ResumeWrite, SubmitFreezeRequest, VersionedWrite, allowance_for, freeze_spans,
            freeze_windows,
        },
    },
};
use tracing::{error, info, warn};
use uuid::Uuid;

use super::errors::{EngineError, EngineResult};

pub(crate) fn membership_status(membership: &MembershipEntity) -> EngineResult<MembershipStatus> {
    MembershipStatus::from_str(&membership.status).ok_or_else(|| {
        EngineError::Internal(anyhow!(
            "membership {} has unknown status `{}`",
            membership.id,
            membership.status
        ))
    })
}

pub struct MembershipFreezeUseCase<M, F, C>
where
    M: MembershipRepository + Send + Sync + 'static,
    F: FreezeRepository + Send + Sync + 'static,
    C: CatalogRepository + Send + Sync + 'static,
{
    membership_repo: Arc<M>,
    freeze_repo: Arc<F>,
    catalog_repo: Arc<C>,
    clock: Arc<dyn Clock>,
    events: Arc<dyn DomainEventPublisher>,
}

impl<M, F, C> MembershipFreezeUseCase<M, F, C>
where
    M: MembershipRepository + Send + Sync + 'static,
    F: FreezeRepository + Send + Sync + 'static,
    C: CatalogRepository + Send + Sync + 'static,
{
    pub fn new(
        membership_repo: Arc<M>,
        freeze_repo: Arc<F>,
        catalog_repo: Arc<C>,
        clock: Arc<dyn Clock>,
        events: Arc<dyn DomainEventPublisher>,
    ) -> Self {
        Self {
            membership_repo,
            freeze_repo,
            catalog_repo,
            clock,
            events,
        }
    }

    async fn load_membership(&self, membership_id: Uuid) -> EngineResult<MembershipEntity> {
        self.membership_repo
            .find_by_id(membership_id)
            .await
            .map_err(|err| {
                error!(%membership_id, db_error = ?err, "membership_freezes: failed to load membership");
                EngineError::Internal(err)
            })?
            .ok_or(EngineError::not_found("membership", membership_id))
    }

    /// Validates the window against the plan's allowance and queues it for review.
    /// The allowance is checked again under a row lock when the rows are written.
    pub async fn submit_freeze(
        &self,
        membership_id: Uuid,
        request: SubmitFreezeRequest,
        requested_by: Uuid,
    ) -> EngineResult<FreezeSubmissionDto> {
        info!(
            %membership_id,
            start_date = %request.start_date,
            end_date = %request.end_date,
            "membership_freezes: freeze requested"
        );

        let membership = self.load_membership(membership_id).await?;
        let status = membership_status(&membership)?;
        if !status.can(MembershipTransition::ApplyFreeze) {
            return Err(InvalidTransition {
                from: status,
                transition: MembershipTransition::ApplyFreeze,
            }
            .into());
        }

        let plan = self
            .catalog_repo
            .find_plan(membership.plan_id)
            .await?
            .ok_or(EngineError::not_found("plan", membership.plan_id))?;

        let freeze_fee_minor = self
            .catalog_repo
            .find_branch_settings(membership.branch_id)
            .await?
            .map(|settings| settings.freeze_fee_minor)
            .unwrap_or(0);

        let histories = self
            .membership_repo
            .list_freeze_histories(membership_id)
            .await?;
        let allowance = allowance_for(&membership, plan.max_freeze_days, &histories);

        let quote = quote_freeze(
            request.start_date,
            request.end_date,
            &allowance,
            freeze_fee_minor,
        )
        .inspect_err(|rejection| {
            warn!(%membership_id, %rejection, "membership_freezes: freeze rejected");
        })?;

        if let Some((existing_start, existing_end)) =
            find_overlap(quote.start_date, quote.end_date, freeze_spans(&histories))
        {
            let rejection = FreezeRejection::OverlappingWindow {
                start: quote.start_date,
                end: quote.end_date,
                existing_start,
                existing_end,
            };
            warn!(%membership_id, %rejection, "membership_freezes: freeze rejected");
            return Err(rejection.into());
        }

        let now = self.clock.now();
        let reason = request.reason.as_deref().and_then(normalize_reason);
        let freeze_history_id = Uuid::new_v4();

        let payload = ApprovalPayload::Freeze(FreezePayload {
            membership_id,
            member_id: membership.member_id,
            freeze_history_id,
            start_date: quote.start_date,
            end_date: quote.end_date,
            days_frozen: quote.days_frozen,
            fee_minor: quote.fee_minor,
            reason: reason.clone(),
        });
        let approval = new_approval_request(
            Uuid::new_v4(),
            membership.branch_id,
            &payload,
            requested_by,
            now,
        )?;

        let reservation = FreezeReservation {
            membership_id,
            freeze: InsertFreezeHistoryEntity {
                id: freeze_history_id,
                membership_id,
                start_date: quote.start_date,
                end_date: quote.end_date,
                days_frozen: quote.days_frozen,
                reason,
                fee_charged_minor: quote.fee_minor,
                status: FreezeStatus::Pending.to_string(),
                created_at: now,
            },
            approval,
        };

        let outcome = self
            .freeze_repo
            .reserve_freeze(reservation)
            .await
            .map_err(|err| {
                error!(%membership_id, db_error = ?err, "membership_freezes: failed to reserve freeze");
                EngineError::Internal(err)
            })?;

        match outcome {
            ReservationOutcome::Created { freeze, approval } => {
                info!(
                    %membership_id,
                    freeze_history_id = %freeze.id,
                    approval_request_id = %approval.id,
                    days_frozen = freeze.days_frozen,
                    "membership_freezes: freeze queued for approval"
                );
                self.events.publish(DomainEvent::FreezeRequested {
                    membership_id,
                    freeze_history_id: freeze.id,
                    approval_request_id: approval.id,
                });
                self.events.publish(DomainEvent::ApprovalSubmitted {
                    approval_request_id: approval.id,
                    approval_type: payload.approval_type(),
                    branch_id: approval.branch_id,
                });
                Ok(FreezeSubmissionDto {
                    freeze_history: freeze.into(),
                    approval_request_id: approval.id,
                })
            }
            ReservationOutcome::InsufficientAllowance { remaining } => {
                warn!(
                    %membership_id,
                    requested = quote.days_frozen,
                    remaining,
                    "membership_freezes: allowance used up by a concurrent request"
                );
                Err(EngineError::InsufficientAllowance {
                    requested: i64::from(quote.days_frozen),
                    remaining,
                })
            }
            ReservationOutcome::Overlap {
                existing_start,
                existing_end,
            } => {
                warn!(
                    %membership_id,
                    %existing_start,
                    %existing_end,
                    "membership_freezes: overlapping window submitted concurrently"
                );
                Err(FreezeRejection::OverlappingWindow {
                    start: quote.start_date,
                    end: quote.end_date,
                    existing_start,
                    existing_end,
                }
                .into())
            }
            ReservationOutcome::NotFreezable { status } => {
                let from = MembershipStatus::from_str(&status).ok_or_else(|| {
                    EngineError::Internal(anyhow!("membership {membership_id} has unknown status `{status}`"))
                })?;
                Err(InvalidTransition {
                    from,
                    transition: MembershipTransition::ApplyFreeze,
                }
                .into())
            }
            ReservationOutcome::MembershipMissing => {
                Err(EngineError::not_found("membership", membership_id))
            }
        }
    }

    /// Recomputes `end_date` and `total_freeze_days_used` from every approved
    /// window. Calling it again without new approvals changes nothing.
    pub async fn resume_from_freeze(&self, membership_id: Uuid) -> EngineResult<MembershipDto> {
        info!(%membership_id, "membership_freezes: resume requested");

        let membership = self.load_membership(membership_id).await?;
        let status = membership_status(&membership)?;

        let next_status = match status {
            MembershipStatus::Active => MembershipStatus::Active,
            other => other.transition(MembershipTransition::ResumeFromFreeze)?,
        };

        let histories = self
            .membership_repo
            .list_freeze_histories(membership_id)
            .await?;
        let quote = quote_resume(membership.original_end_date, freeze_windows(&histories))
            .ok_or_else(|| {
                EngineError::Internal(anyhow!(
                    "membership {membership_id} end date overflows after freeze extension"
                ))
            })?;

        let unchanged = status == next_status
            && membership.end_date == quote.new_end_date
            && membership.total_freeze_days_used == quote.total_frozen_days;
        if unchanged {
            info!(%membership_id, "membership_freezes: resume is a no-op");
            return Ok(membership.into());
        }

        let write = ResumeWrite {
            membership_id,
            expected_version: membership.lock_version,
            status: next_status,
            end_date: quote.new_end_date,
            total_freeze_days_used: quote.total_frozen_days,
            updated_at: self.clock.now(),
        };

        match self.membership_repo.apply_resume(write).await? {
            VersionedWrite::Applied(updated) => {
                info!(
                    %membership_id,
                    end_date = %updated.end_date,
                    total_freeze_days_used = updated.total_freeze_days_used,
                    "membership_freezes: membership resumed"
                );
                self.events.publish(DomainEvent::MembershipResumed {
                    membership_id,
                    end_date: updated.end_date,
                });
                Ok(updated.into())
            }
            VersionedWrite::Conflict => {
                warn!(%membership_id, "membership_freezes: resume lost a concurrent update");
                Err(EngineError::PersistenceConflict)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usecases::fixtures::{branch_settings, date, freeze_history, membership, plan};
    use crates::domain::{
        clock::FixedClock,
        entities::{approval_requests::ApprovalRequestEntity, freeze_histories::FreezeHistoryEntity},
        repositories::{
            catalog::MockCatalogRepository, domain_events::MockDomainEventPublisher,
            freezes::MockFreezeRepository, memberships::MockMembershipRepository,
        },
    };
    use mockall::predicate::eq;

    type TestUseCase = MembershipFreezeUseCase<
        MockMembershipRepository,
        MockFreezeRepository,
        MockCatalogRepository,
    >;

    fn usecase(
        memberships: MockMembershipRepository,
        freezes: MockFreezeRepository,
        catalog: MockCatalogRepository,
        events: MockDomainEventPublisher,
    ) -> TestUseCase {
        MembershipFreezeUseCase::new(
            Arc::new(memberships),
            Arc::new(freezes),
            Arc::new(catalog),
            Arc::new(FixedClock::at_date(date(2024, 1, 5))),
            Arc::new(events),
        )
    }

    fn created_rows(reservation: &FreezeReservation) -> ReservationOutcome {
        let freeze = FreezeHistoryEntity {
            id: reservation.freeze.id,
            membership_id: reservation.freeze.membership_id,
            start_date: reservation.freeze.start_date,
            end_date: reservation.freeze.end_date,
            days_frozen: reservation.freeze.days_frozen,
            reason: reservation.freeze.reason.clone(),
            fee_charged_minor: reservation.freeze.fee_charged_minor,
            status: reservation.freeze.status.clone(),
            approved_by: None,
            approved_at: None,
            applied_at: None,
            created_at: reservation.freeze.created_at,
        };
        let approval = ApprovalRequestEntity {
            id: reservation.approval.id,
            branch_id: reservation.approval.branch_id,
            approval_type: reservation.approval.approval_type.clone(),
            reference_type: reservation.approval.reference_type.clone(),
            reference_id: reservation.approval.reference_id,
            request_data: reservation.approval.request_data.clone(),
            status: reservation.approval.status.clone(),
            requested_by: reservation.approval.requested_by,
            reviewed_by: None,
            reviewed_at: None,
            review_notes: None,
            created_at: reservation.approval.created_at,
        };
        ReservationOutcome::Created { freeze, approval }
    }

    fn catalog_for(m: &MembershipEntity, max_freeze_days: i32, fee: i64) -> MockCatalogRepository {
        let mut catalog = MockCatalogRepository::new();
        let plan = plan(m.plan_id, max_freeze_days);
        catalog
            .expect_find_plan()
            .with(eq(m.plan_id))
            .returning(move |_| Ok(Some(plan.clone())));
        let settings = branch_settings(m.branch_id, fee);
        catalog
            .expect_find_branch_settings()
            .with(eq(m.branch_id))
            .returning(move |_| Ok(Some(settings.clone())));
        catalog
    }

    #[tokio::test]
    async fn submit_freeze_queues_window_and_approval_together() {
        let m = membership(MembershipStatus::Active);
        let membership_id = m.id;
        let requester = Uuid::new_v4();

        let mut memberships = MockMembershipRepository::new();
        let found = m.clone();
        memberships
            .expect_find_by_id()
            .with(eq(membership_id))
            .returning(move |_| Ok(Some(found.clone())));
        memberships
            .expect_list_freeze_histories()
            .returning(|_| Ok(Vec::new()));

        let mut freezes = MockFreezeRepository::new();
        freezes
            .expect_reserve_freeze()
            .times(1)
            .withf(move |r| {
                r.freeze.days_frozen == 5
                    && r.freeze.fee_charged_minor == 500
                    && r.freeze.status == "pending"
                    && r.approval.approval_type == "freeze"
                    && r.approval.reference_type == "freeze_history"
                    && r.approval.reference_id == r.freeze.id
                    && r.approval.requested_by == requester
            })
            .returning(|r| Ok(created_rows(&r)));

        let mut events = MockDomainEventPublisher::new();
        events
            .expect_publish()
            .withf(|e| matches!(e, DomainEvent::FreezeRequested { .. }))
            .times(1)
            .return_const(());
        events
            .expect_publish()
            .withf(|e| matches!(e, DomainEvent::ApprovalSubmitted { .. }))
            .times(1)
            .return_const(());

        let usecase = usecase(memberships, freezes, catalog_for(&m, 30, 500), events);
        let result = usecase
            .submit_freeze(
                membership_id,
                SubmitFreezeRequest {
                    start_date: date(2024, 1, 11),
                    end_date: date(2024, 1, 15),
                    reason: Some("  travel ".to_string()),
                },
                requester,
            )
            .await
            .unwrap();

        assert_eq!(result.freeze_history.days_frozen, 5);
        assert_eq!(result.freeze_history.reason.as_deref(), Some("travel"));
        assert_eq!(result.freeze_history.status, "pending");
    }

    #[tokio::test]
    async fn submit_freeze_over_allowance_writes_nothing() {
        let m = membership(MembershipStatus::Active);
        let membership_id = m.id;

        let mut memberships = MockMembershipRepository::new();
        let found = m.clone();
        memberships
            .expect_find_by_id()
            .returning(move |_| Ok(Some(found.clone())));
        memberships
            .expect_list_freeze_histories()
            .returning(|_| Ok(Vec::new()));

        let mut freezes = MockFreezeRepository::new();
        freezes.expect_reserve_freeze().never();

        let mut events = MockDomainEventPublisher::new();
        events.expect_publish().never();

        let usecase = usecase(memberships, freezes, catalog_for(&m, 30, 0), events);
        let err = usecase
            .submit_freeze(
                membership_id,
                SubmitFreezeRequest {
                    start_date: date(2024, 3, 1),
                    end_date: date(2024, 4, 9),
                    reason: None,
                },
                Uuid::new_v4(),
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            EngineError::InsufficientAllowance {
                requested: 40,
                remaining: 30
            }
        ));
    }

    #[tokio::test]
    async fn pending_windows_reduce_allowance_before_commit() {
        let m = membership(MembershipStatus::Active);
        let membership_id = m.id;

        let mut memberships = MockMembershipRepository::new();
        let found = m.clone();
        memberships
            .expect_find_by_id()
            .returning(move |_| Ok(Some(found.clone())));
        let pending = freeze_history(
            membership_id,
            date(2024, 1, 10),
            date(2024, 1, 17),
            FreezeStatus::Pending,
        );
        memberships
            .expect_list_freeze_histories()
            .returning(move |_| Ok(vec![pending.clone()]));

        let mut freezes = MockFreezeRepository::new();
        freezes.expect_reserve_freeze().never();

        let usecase = usecase(
            memberships,
            freezes,
            catalog_for(&m, 10, 0),
            MockDomainEventPublisher::new(),
        );
        let err = usecase
            .submit_freeze(
                membership_id,
                SubmitFreezeRequest {
                    start_date: date(2024, 1, 20),
                    end_date: date(2024, 1, 22),
                    reason: None,
                },
                Uuid::new_v4(),
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            EngineError::InsufficientAllowance {
                requested: 3,
                remaining: 2
            }
        ));
    }

    #[tokio::test]
    async fn reversed_dates_are_invalid_range() {
        let m = membership(MembershipStatus::Active);

        let mut memberships = MockMembershipRepository::new();
        let found = m.clone();
        memberships
            .expect_find_by_id()
            .returning(move |_| Ok(Some(found.clone())));
        memberships
            .expect_list_freeze_histories()
            .returning(|_| Ok(Vec::new()));

        let usecase = usecase(
            memberships,
            MockFreezeRepository::new(),
            catalog_for(&m, 30, 0),
            MockDomainEventPublisher::new(),
        );
        let err = usecase
            .submit_freeze(
                m.id,
                SubmitFreezeRequest {
                    start_date: date(2024, 1, 15),
                    end_date: date(2024, 1, 11),
                    reason: None,
                },
                Uuid::new_v4(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::InvalidDateRange { .. }));
    }

    #[tokio::test]
    async fn concurrent_submission_losing_the_race_reports_allowance() {
        let m = membership(MembershipStatus::Active);

        let mut memberships = MockMembershipRepository::new();
        let found = m.clone();
        memberships
            .expect_find_by_id()
            .returning(move |_| Ok(Some(found.clone())));
        memberships
            .expect_list_freeze_histories()
            .returning(|_| Ok(Vec::new()));

        let mut freezes = MockFreezeRepository::new();
        freezes
            .expect_reserve_freeze()
            .returning(|_| Ok(ReservationOutcome::InsufficientAllowance { remaining: 1 }));

        let mut events = MockDomainEventPublisher::new();
        events.expect_publish().never();

        let usecase = usecase(memberships, freezes, catalog_for(&m, 30, 0), events);
        let err = usecase
            .submit_freeze(
                m.id,
                SubmitFreezeRequest {
                    start_date: date(2024, 1, 11),
                    end_date: date(2024, 1, 15),
                    reason: None,
                },
                Uuid::new_v4(),
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            EngineError::InsufficientAllowance {
                requested: 5,
                remaining: 1
            }
        ));
    }

    #[tokio::test]
    async fn identical_window_is_rejected_as_overlap() {
        let m = membership(MembershipStatus::Active);
        let membership_id = m.id;

        let mut memberships = MockMembershipRepository::new();
        let found = m.clone();
        memberships
            .expect_find_by_id()
            .returning(move |_| Ok(Some(found.clone())));
        let approved = freeze_history(
            membership_id,
            date(2024, 1, 11),
            date(2024, 1, 15),
            FreezeStatus::Approved,
        );
        memberships
            .expect_list_freeze_histories()
            .returning(move |_| Ok(vec![approved.clone()]));

        let mut freezes = MockFreezeRepository::new();
        freezes.expect_reserve_freeze().never();

        let mut events = MockDomainEventPublisher::new();
        events.expect_publish().never();

        let usecase = usecase(memberships, freezes, catalog_for(&m, 30, 0), events);
        let err = usecase
            .submit_freeze(
                membership_id,
                SubmitFreezeRequest {
                    start_date: date(2024, 1, 11),
                    end_date: date(2024, 1, 15),
                    reason: None,
                },
                Uuid::new_v4(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::ValidationError(message) if message.contains("overlaps")));
    }

    #[tokio::test]
    async fn overlap_found_under_lock_is_rejected() {
        let m = membership(MembershipStatus::Active);

        let mut memberships = MockMembershipRepository::new();
        let found = m.clone();
        memberships
            .expect_find_by_id()
            .returning(move |_| Ok(Some(found.clone())));
        memberships
            .expect_list_freeze_histories()
            .returning(|_| Ok(Vec::new()));

        let mut freezes = MockFreezeRepository::new();
        freezes.expect_reserve_freeze().times(1).returning(|_| {
            Ok(ReservationOutcome::Overlap {
                existing_start: date(2024, 1, 13),
                existing_end: date(2024, 1, 14),
            })
        });

        let mut events = MockDomainEventPublisher::new();
        events.expect_publish().never();

        let usecase = usecase(memberships, freezes, catalog_for(&m, 30, 0), events);
        let err = usecase
            .submit_freeze(
                m.id,
                SubmitFreezeRequest {
                    start_date: date(2024, 1, 11),
                    end_date: date(2024, 1, 15),
                    reason: None,
                },
                Uuid::new_v4(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::ValidationError(_)));
        assert_eq!(err.status_code(), axum::http::StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn cancelled_membership_cannot_request_freeze() {
        let m = membership(MembershipStatus::Cancelled);

        let mut memberships = MockMembershipRepository::new();
        let found = m.clone();
        memberships
            .expect_find_by_id()
            .returning(move |_| Ok(Some(found.clone())));

        let usecase = usecase(
            memberships,
            MockFreezeRepository::new(),
            MockCatalogRepository::new(),
            MockDomainEventPublisher::new(),
        );
        let err = usecase
            .submit_freeze(
                m.id,
                SubmitFreezeRequest {
                    start_date: date(2024, 1, 11),
                    end_date: date(2024, 1, 15),
                    reason: None,
                },
                Uuid::new_v4(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::InvalidTransition(_)));
    }

    #[tokio::test]
    async fn resume_extends_end_date_by_approved_days() {
        let m = membership(MembershipStatus::Frozen);
        let membership_id = m.id;
        let version = m.lock_version;

        let mut memberships = MockMembershipRepository::new();
        let found = m.clone();
        memberships
            .expect_find_by_id()
            .returning(move |_| Ok(Some(found.clone())));
        let approved = freeze_history(
            membership_id,
            date(2024, 1, 11),
            date(2024, 1, 15),
            FreezeStatus::Approved,
        );
        let rejected = freeze_history(
            membership_id,
            date(2024, 1, 20),
            date(2024, 1, 29),
            FreezeStatus::Rejected,
        );
        memberships
            .expect_list_freeze_histories()
            .returning(move |_| Ok(vec![rejected.clone(), approved.clone()]));

        let stored = m.clone();
        memberships
            .expect_apply_resume()
            .times(1)
            .withf(move |w| {
                w.expected_version == version
                    && w.status == MembershipStatus::Active
                    && w.end_date == date(2024, 2, 5)
                    && w.total_freeze_days_used == 5
            })
            .returning(move |w| {
                let mut updated = stored.clone();
                updated.status = w.status.to_string();
                updated.end_date = w.end_date;
                updated.total_freeze_days_used = w.total_freeze_days_used;
                updated.lock_version += 1;
                Ok(VersionedWrite::Applied(updated))
            });

        let mut events = MockDomainEventPublisher::new();
        events
            .expect_publish()
            .withf(move |e| {
                *e == DomainEvent::MembershipResumed {
                    membership_id,
                    end_date: date(2024, 2, 5),
                }
            })
            .times(1)
            .return_const(());

        let usecase = usecase(
            memberships,
            MockFreezeRepository::new(),
            MockCatalogRepository::new(),
            events,
        );
        let resumed = usecase.resume_from_freeze(membership_id).await.unwrap();

        assert_eq!(resumed.status, "active");
        assert_eq!(resumed.end_date, date(2024, 2, 5));
        assert_eq!(resumed.total_freeze_days_used, 5);
    }

    #[tokio::test]
    async fn resuming_again_is_a_no_op() {
        let mut m = membership(MembershipStatus::Active);
        m.end_date = date(2024, 2, 5);
        m.total_freeze_days_used = 5;
        let membership_id = m.id;

        let mut memberships = MockMembershipRepository::new();
        let found = m.clone();
        memberships
            .expect_find_by_id()
            .returning(move |_| Ok(Some(found.clone())));
        let approved = freeze_history(
            membership_id,
            date(2024, 1, 11),
            date(2024, 1, 15),
            FreezeStatus::Approved,
        );
        memberships
            .expect_list_freeze_histories()
            .returning(move |_| Ok(vec![approved.clone()]));
        memberships.expect_apply_resume().never();

        let mut events = MockDomainEventPublisher::new();
        events.expect_publish().never();

        let usecase = usecase(
            memberships,
            MockFreezeRepository::new(),
            MockCatalogRepository::new(),
            events,
        );
        let first = usecase.resume_from_freeze(membership_id).await.unwrap();
        let second = usecase.resume_from_freeze(membership_id).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first.end_date, date(2024, 2, 5));
        assert_eq!(first.total_freeze_days_used, 5);
    }

    #[tokio::test]
    async fn resume_loses_to_approval_committed_after_history_read() {
        let m = membership(MembershipStatus::Frozen);
        let membership_id = m.id;
        let read_version = m.lock_version;

        let mut memberships = MockMembershipRepository::new();
        let found = m.clone();
        memberships
            .expect_find_by_id()
            .returning(move |_| Ok(Some(found.clone())));
        let approved = freeze_history(
            membership_id,
            date(2024, 1, 11),
            date(2024, 1, 15),
            FreezeStatus::Approved,
        );
        memberships
            .expect_list_freeze_histories()
            .returning(move |_| Ok(vec![approved.clone()]));
        // a second window's approval bumped lock_version after the read above
        memberships
            .expect_apply_resume()
            .withf(move |w| w.expected_version == read_version && w.total_freeze_days_used == 5)
            .times(1)
            .returning(|_| Ok(VersionedWrite::Conflict));

        let mut events = MockDomainEventPublisher::new();
        events.expect_publish().never();

        let usecase = usecase(
            memberships,
            MockFreezeRepository::new(),
            MockCatalogRepository::new(),
            events,
        );
        let err = usecase.resume_from_freeze(membership_id).await.unwrap_err();

        assert!(matches!(err, EngineError::PersistenceConflict));
    }

    #[tokio::test]
    async fn resume_on_stale_version_is_conflict() {
        let m = membership(MembershipStatus::Frozen);

        let mut memberships = MockMembershipRepository::new();
        let found = m.clone();
        memberships
            .expect_find_by_id()
            .returning(move |_| Ok(Some(found.clone())));
        memberships
            .expect_list_freeze_histories()
            .returning(|_| Ok(Vec::new()));
        memberships
            .expect_apply_resume()
            .returning(|_| Ok(VersionedWrite::Conflict));

        let usecase = usecase(
            memberships,
            MockFreezeRepository::new(),
            MockCatalogRepository::new(),
            MockDomainEventPublisher::new(),
        );
        let err = usecase.resume_from_freeze(m.id).await.unwrap_err();

        assert!(matches!(err, EngineError::PersistenceConflict));
    }

    #[tokio::test]
    async fn resume_on_expired_membership_is_invalid_transition() {
        let m = membership(MembershipStatus::Expired);

        let mut memberships = MockMembershipRepository::new();
        let found = m.clone();
        memberships
            .expect_find_by_id()
            .returning(move |_| Ok(Some(found.clone())));

        let usecase = usecase(
            memberships,
            MockFreezeRepository::new(),
            MockCatalogRepository::new(),
            MockDomainEventPublisher::new(),
        );
        let err = usecase.resume_from_freeze(m.id).await.unwrap_err();

        assert!(matches!(err, EngineError::InvalidTransition(_)));
    }

    #[tokio::test]
    async fn unknown_membership_is_not_found() {
        let mut memberships = MockMembershipRepository::new();
        memberships.expect_find_by_id().returning(|_| Ok(None));

        let usecase = usecase(
            memberships,
            MockFreezeRepository::new(),
            MockCatalogRepository::new(),
            MockDomainEventPublisher::new(),
        );
        let err = usecase.resume_from_freeze(Uuid::new_v4()).await.unwrap_err();

        assert!(matches!(err, EngineError::NotFound { entity: "membership", .. }));
    }
}
