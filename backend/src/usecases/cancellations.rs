use std::sync::Arc;

use crates::domain::{
    clock::Clock,
    repositories::{domain_events::DomainEventPublisher, memberships::MembershipRepository},
    value_objects::{
        cancellations::{normalize_reason, quote_refund},
        domain_events::DomainEvent,
        enums::reference_types::ReferenceType,
        membership_transitions::MembershipTransition,
        memberships::{
            CancelMembershipRequest, CancellationDto, CancellationOutcome, CancellationWrite,
        },
        reversals::ReversalSpec,
    },
};
use tracing::{error, info, warn};
use uuid::Uuid;

use super::{
    errors::{EngineError, EngineResult},
    membership_freezes::membership_status,
};

pub struct CancellationUseCase<M>
where
    M: MembershipRepository + Send + Sync + 'static,
{
    membership_repo: Arc<M>,
    clock: Arc<dyn Clock>,
    events: Arc<dyn DomainEventPublisher>,
}

impl<M> CancellationUseCase<M>
where
    M: MembershipRepository + Send + Sync + 'static,
{
    pub fn new(
        membership_repo: Arc<M>,
        clock: Arc<dyn Clock>,
        events: Arc<dyn DomainEventPublisher>,
    ) -> Self {
        Self {
            membership_repo,
            clock,
            events,
        }
    }

    pub async fn cancel_membership(
        &self,
        membership_id: Uuid,
        request: CancelMembershipRequest,
        cancelled_by: Uuid,
    ) -> EngineResult<CancellationDto> {
        info!(
            %membership_id,
            policy = request.refund_policy.as_str(),
            "cancellations: cancel requested"
        );

        let reason = normalize_reason(&request.reason).ok_or_else(|| {
            EngineError::ValidationError("cancellation reason is required".to_string())
        })?;

        let membership = self
            .membership_repo
            .find_by_id(membership_id)
            .await?
            .ok_or(EngineError::not_found("membership", membership_id))?;

        let status = membership_status(&membership)?;
        if status.transition(MembershipTransition::Cancel).is_err() {
            return Err(EngineError::NotCancellable {
                status: status.to_string(),
            });
        }

        let quote = quote_refund(
            request.refund_policy,
            membership.price_paid_minor,
            membership.start_date,
            membership.end_date,
            self.clock.today(),
        )
        .inspect_err(|rejection| {
            warn!(%membership_id, %rejection, "cancellations: refund rejected");
        })?;

        let reversal = (quote.refund_minor > 0).then(|| ReversalSpec {
            reference_type: ReferenceType::MembershipRefund,
            reference_id: membership_id,
            branch_id: membership.branch_id,
            member_id: membership.member_id,
            amount_minor: quote.refund_minor,
            reason: reason.clone(),
            method: request.refund_method,
            recorded_by: cancelled_by,
        });

        let write = CancellationWrite {
            membership_id,
            expected_version: membership.lock_version,
            cancelled_at: self.clock.now(),
            cancelled_by,
            reason,
            refund_amount_minor: quote.refund_minor,
            reversal,
        };

        let outcome = self.membership_repo.cancel(write).await.map_err(|err| {
            error!(%membership_id, db_error = ?err, "cancellations: cancellation rolled back");
            EngineError::Internal(err)
        })?;

        let CancellationOutcome::Cancelled {
            membership: cancelled,
            reversal,
            member_deactivated,
        } = outcome
        else {
            warn!(%membership_id, "cancellations: membership changed during cancellation");
            return Err(EngineError::PersistenceConflict);
        };

        info!(
            %membership_id,
            refund_amount_minor = quote.refund_minor,
            member_deactivated,
            "cancellations: membership cancelled"
        );

        self.events.publish(DomainEvent::MembershipCancelled {
            membership_id,
            member_id: cancelled.member_id,
            refund_amount_minor: quote.refund_minor,
        });
        if let Some(receipt) = reversal.filter(|receipt| receipt.created) {
            self.events.publish(DomainEvent::ReversalRecorded {
                reversal_id: receipt.reversal_id,
                reference_type: ReferenceType::MembershipRefund,
                reference_id: membership_id,
            });
        }

        Ok(CancellationDto {
            membership: cancelled.into(),
            refund_amount_minor: quote.refund_minor,
            reversal,
            member_deactivated,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usecases::fixtures::{date, membership};
    use crates::domain::{
        clock::FixedClock,
        entities::memberships::MembershipEntity,
        repositories::{
            domain_events::MockDomainEventPublisher, memberships::MockMembershipRepository,
        },
        value_objects::{
            cancellations::RefundPolicy,
            enums::{membership_statuses::MembershipStatus, payment_methods::PaymentMethod},
            reversals::ReversalReceipt,
        },
    };

    fn usecase(
        repo: MockMembershipRepository,
        events: MockDomainEventPublisher,
    ) -> CancellationUseCase<MockMembershipRepository> {
        CancellationUseCase::new(
            Arc::new(repo),
            Arc::new(FixedClock::at_date(date(2024, 1, 11))),
            Arc::new(events),
        )
    }

    fn request(policy: RefundPolicy) -> CancelMembershipRequest {
        CancelMembershipRequest {
            reason: "moving away".to_string(),
            refund_policy: policy,
            refund_method: PaymentMethod::Cash,
        }
    }

    fn repo_returning(m: &MembershipEntity) -> MockMembershipRepository {
        let mut repo = MockMembershipRepository::new();
        let found = m.clone();
        repo.expect_find_by_id()
            .returning(move |_| Ok(Some(found.clone())));
        repo
    }

    fn cancelled_from(m: &MembershipEntity, write: &CancellationWrite) -> MembershipEntity {
        MembershipEntity {
            status: MembershipStatus::Cancelled.to_string(),
            cancelled_at: Some(write.cancelled_at),
            cancelled_by: Some(write.cancelled_by),
            cancellation_reason: Some(write.reason.clone()),
            refund_amount_minor: Some(write.refund_amount_minor),
            lock_version: m.lock_version + 1,
            ..m.clone()
        }
    }

    #[tokio::test]
    async fn prorated_cancellation_writes_reversal_and_deactivates_member() {
        let mut m = membership(MembershipStatus::Active);
        m.price_paid_minor = 1200;
        let membership_id = m.id;
        let reversal_id = Uuid::new_v4();

        let mut repo = repo_returning(&m);
        let stored = m.clone();
        repo.expect_cancel()
            .times(1)
            .withf(move |w| {
                w.expected_version == 3
                    && w.refund_amount_minor == 800
                    && w.reason == "moving away"
                    && w.reversal.as_ref().is_some_and(|r| {
                        r.amount_minor == 800
                            && r.reference_type == ReferenceType::MembershipRefund
                            && r.reference_id == membership_id
                            && r.method == PaymentMethod::Cash
                    })
            })
            .returning(move |w| {
                Ok(CancellationOutcome::Cancelled {
                    membership: cancelled_from(&stored, &w),
                    reversal: Some(ReversalReceipt {
                        reversal_id,
                        created: true,
                    }),
                    member_deactivated: true,
                })
            });

        let mut events = MockDomainEventPublisher::new();
        events
            .expect_publish()
            .withf(|e| matches!(e, DomainEvent::MembershipCancelled { refund_amount_minor: 800, .. }))
            .times(1)
            .return_const(());
        events
            .expect_publish()
            .withf(move |e| {
                matches!(e, DomainEvent::ReversalRecorded { reversal_id: id, .. } if *id == reversal_id)
            })
            .times(1)
            .return_const(());

        let dto = usecase(repo, events)
            .cancel_membership(membership_id, request(RefundPolicy::Prorated), Uuid::new_v4())
            .await
            .unwrap();

        assert_eq!(dto.refund_amount_minor, 800);
        assert_eq!(dto.membership.status, "cancelled");
        assert!(dto.member_deactivated);
    }

    #[tokio::test]
    async fn full_refund_returns_price_paid() {
        let m = membership(MembershipStatus::Frozen);

        let mut repo = repo_returning(&m);
        let stored = m.clone();
        repo.expect_cancel()
            .withf(|w| w.refund_amount_minor == 3000)
            .returning(move |w| {
                Ok(CancellationOutcome::Cancelled {
                    membership: cancelled_from(&stored, &w),
                    reversal: Some(ReversalReceipt {
                        reversal_id: Uuid::new_v4(),
                        created: true,
                    }),
                    member_deactivated: false,
                })
            });

        let mut events = MockDomainEventPublisher::new();
        events.expect_publish().times(2).return_const(());

        let dto = usecase(repo, events)
            .cancel_membership(m.id, request(RefundPolicy::Full), Uuid::new_v4())
            .await
            .unwrap();

        assert_eq!(dto.refund_amount_minor, 3000);
        assert!(!dto.member_deactivated);
    }

    #[tokio::test]
    async fn no_refund_skips_the_ledger() {
        let m = membership(MembershipStatus::Active);

        let mut repo = repo_returning(&m);
        let stored = m.clone();
        repo.expect_cancel()
            .withf(|w| w.refund_amount_minor == 0 && w.reversal.is_none())
            .returning(move |w| {
                Ok(CancellationOutcome::Cancelled {
                    membership: cancelled_from(&stored, &w),
                    reversal: None,
                    member_deactivated: true,
                })
            });

        let mut events = MockDomainEventPublisher::new();
        events
            .expect_publish()
            .withf(|e| matches!(e, DomainEvent::MembershipCancelled { .. }))
            .times(1)
            .return_const(());

        let dto = usecase(repo, events)
            .cancel_membership(m.id, request(RefundPolicy::None), Uuid::new_v4())
            .await
            .unwrap();

        assert!(dto.reversal.is_none());
    }

    #[tokio::test]
    async fn replayed_reversal_is_not_announced_twice() {
        let m = membership(MembershipStatus::Active);

        let mut repo = repo_returning(&m);
        let stored = m.clone();
        repo.expect_cancel().returning(move |w| {
            Ok(CancellationOutcome::Cancelled {
                membership: cancelled_from(&stored, &w),
                reversal: Some(ReversalReceipt {
                    reversal_id: Uuid::new_v4(),
                    created: false,
                }),
                member_deactivated: false,
            })
        });

        let mut events = MockDomainEventPublisher::new();
        events
            .expect_publish()
            .withf(|e| matches!(e, DomainEvent::MembershipCancelled { .. }))
            .times(1)
            .return_const(());

        usecase(repo, events)
            .cancel_membership(
                m.id,
                request(RefundPolicy::Custom { amount_minor: 500 }),
                Uuid::new_v4(),
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn blank_reason_is_validation_error() {
        let mut repo = MockMembershipRepository::new();
        repo.expect_find_by_id().never();

        let mut req = request(RefundPolicy::Full);
        req.reason = "   ".to_string();

        let err = usecase(repo, MockDomainEventPublisher::new())
            .cancel_membership(Uuid::new_v4(), req, Uuid::new_v4())
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::ValidationError(_)));
    }

    #[tokio::test]
    async fn custom_amount_above_price_is_rejected() {
        let m = membership(MembershipStatus::Active);

        let mut repo = repo_returning(&m);
        repo.expect_cancel().never();

        let err = usecase(repo, MockDomainEventPublisher::new())
            .cancel_membership(
                m.id,
                request(RefundPolicy::Custom { amount_minor: 3001 }),
                Uuid::new_v4(),
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            EngineError::InvalidRefundAmount {
                amount_minor: 3001,
                price_paid_minor: 3000
            }
        ));
    }

    #[tokio::test]
    async fn terminal_and_pending_memberships_are_not_cancellable() {
        for status in [
            MembershipStatus::Cancelled,
            MembershipStatus::Expired,
            MembershipStatus::Pending,
        ] {
            let m = membership(status);
            let mut repo = repo_returning(&m);
            repo.expect_cancel().never();

            let err = usecase(repo, MockDomainEventPublisher::new())
                .cancel_membership(m.id, request(RefundPolicy::Full), Uuid::new_v4())
                .await
                .unwrap_err();

            assert!(
                matches!(&err, EngineError::NotCancellable { status: s } if *s == status.to_string())
            );
        }
    }

    #[tokio::test]
    async fn concurrent_change_is_persistence_conflict() {
        let m = membership(MembershipStatus::Active);

        let mut repo = repo_returning(&m);
        repo.expect_cancel()
            .returning(|_| Ok(CancellationOutcome::Conflict));

        let mut events = MockDomainEventPublisher::new();
        events.expect_publish().never();

        let err = usecase(repo, events)
            .cancel_membership(m.id, request(RefundPolicy::None), Uuid::new_v4())
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::PersistenceConflict));
    }
}
