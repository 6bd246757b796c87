use anyhow::Result;
use chrono::NaiveDate;
use crates::domain::{
    clock::Clock,
    repositories::{domain_events::DomainEventPublisher, memberships::MembershipRepository},
    value_objects::{domain_events::DomainEvent, memberships::VersionedWrite},
};
use serde::Serialize;
use std::{collections::HashSet, sync::Arc};
use tracing::{error, info, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub scanned: usize,
    pub frozen: usize,
    pub expired: usize,
    pub conflicts: usize,
    pub failed: usize,
}

/// Moves memberships whose dates have arrived: approved freezes that have
/// started, and active terms that have ended. Each row is its own write.
pub struct MembershipSweepUseCase {
    repository: Arc<dyn MembershipRepository + Send + Sync>,
    clock: Arc<dyn Clock>,
    events: Arc<dyn DomainEventPublisher>,
}

impl MembershipSweepUseCase {
    pub fn new(
        repository: Arc<dyn MembershipRepository + Send + Sync>,
        clock: Arc<dyn Clock>,
        events: Arc<dyn DomainEventPublisher>,
    ) -> Self {
        Self {
            repository,
            clock,
            events,
        }
    }

    pub async fn run_now(&self) -> Result<SweepReport> {
        self.run(self.clock.today()).await
    }

    pub async fn run(&self, today: NaiveDate) -> Result<SweepReport> {
        let mut report = SweepReport::default();

        self.apply_due_freezes(today, &mut report).await?;
        self.expire_ended(today, &mut report).await?;

        info!(
            %today,
            scanned = report.scanned,
            frozen = report.frozen,
            expired = report.expired,
            conflicts = report.conflicts,
            failed = report.failed,
            "membership_sweep: run finished"
        );
        Ok(report)
    }

    async fn apply_due_freezes(&self, today: NaiveDate, report: &mut SweepReport) -> Result<()> {
        let due = self.repository.list_due_freezes(today).await?;
        let mut touched = HashSet::new();

        for window in due {
            report.scanned += 1;
            // one freeze per membership per run; the next window waits for a later sweep
            if !touched.insert(window.membership_id) {
                continue;
            }

            match self.repository.apply_due_freeze(window, self.clock.now()).await {
                Ok(VersionedWrite::Applied(_)) => {
                    report.frozen += 1;
                    info!(
                        membership_id = %window.membership_id,
                        freeze_history_id = %window.freeze_history_id,
                        "membership_sweep: freeze applied"
                    );
                    self.events.publish(DomainEvent::MembershipFrozen {
                        membership_id: window.membership_id,
                        freeze_history_id: window.freeze_history_id,
                    });
                }
                Ok(VersionedWrite::Conflict) => {
                    report.conflicts += 1;
                    warn!(
                        membership_id = %window.membership_id,
                        "membership_sweep: membership changed before freeze was applied"
                    );
                }
                Err(err) => {
                    report.failed += 1;
                    error!(
                        membership_id = %window.membership_id,
                        db_error = ?err,
                        "membership_sweep: failed to apply freeze"
                    );
                }
            }
        }

        Ok(())
    }

    async fn expire_ended(&self, today: NaiveDate, report: &mut SweepReport) -> Result<()> {
        let ended = self.repository.list_expirable(today).await?;

        for membership in ended {
            report.scanned += 1;

            match self
                .repository
                .expire(membership.id, membership.lock_version, self.clock.now())
                .await
            {
                Ok(VersionedWrite::Applied(_)) => {
                    report.expired += 1;
                    info!(
                        membership_id = %membership.id,
                        end_date = %membership.end_date,
                        "membership_sweep: membership expired"
                    );
                    self.events.publish(DomainEvent::MembershipExpired {
                        membership_id: membership.id,
                    });
                }
                Ok(VersionedWrite::Conflict) => {
                    report.conflicts += 1;
                    warn!(
                        membership_id = %membership.id,
                        "membership_sweep: membership changed before expiry"
                    );
                }
                Err(err) => {
                    report.failed += 1;
                    error!(
                        membership_id = %membership.id,
                        db_error = ?err,
                        "membership_sweep: failed to expire membership"
                    );
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use crates::domain::{
        clock::FixedClock,
        entities::memberships::MembershipEntity,
        repositories::{
            domain_events::MockDomainEventPublisher, memberships::MockMembershipRepository,
        },
        value_objects::memberships::DueFreeze,
    };
    use mockall::predicate::eq;
    use uuid::Uuid;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn active_membership(end_date: NaiveDate) -> MembershipEntity {
        let now = Utc::now();
        MembershipEntity {
            id: Uuid::new_v4(),
            member_id: Uuid::new_v4(),
            plan_id: Uuid::new_v4(),
            branch_id: Uuid::new_v4(),
            start_date: date(2024, 1, 1),
            original_end_date: end_date,
            end_date,
            status: "active".to_string(),
            price_paid_minor: 3000,
            discount_amount_minor: 0,
            total_freeze_days_used: 0,
            created_by: None,
            cancelled_at: None,
            cancelled_by: None,
            cancellation_reason: None,
            refund_amount_minor: None,
            lock_version: 1,
            created_at: now,
            updated_at: now,
        }
    }

    fn due(membership_id: Uuid) -> DueFreeze {
        DueFreeze {
            membership_id,
            freeze_history_id: Uuid::new_v4(),
            lock_version: 1,
        }
    }

    fn usecase(
        repo: MockMembershipRepository,
        events: MockDomainEventPublisher,
    ) -> MembershipSweepUseCase {
        MembershipSweepUseCase::new(
            Arc::new(repo),
            Arc::new(FixedClock::at_date(date(2024, 2, 10))),
            Arc::new(events),
        )
    }

    #[tokio::test]
    async fn sweep_freezes_due_windows_and_expires_ended_terms() {
        let today = date(2024, 2, 10);
        let frozen_window = due(Uuid::new_v4());
        let raced_window = due(Uuid::new_v4());
        let ended = active_membership(date(2024, 2, 9));
        let ended_id = ended.id;

        let mut repo = MockMembershipRepository::new();
        let windows = vec![frozen_window, raced_window];
        repo.expect_list_due_freezes()
            .with(eq(today))
            .returning(move |_| Ok(windows.clone()));
        let applied_row = active_membership(date(2024, 3, 1));
        repo.expect_apply_due_freeze()
            .times(2)
            .returning(move |window, _| {
                if window == frozen_window {
                    Ok(VersionedWrite::Applied(applied_row.clone()))
                } else {
                    Ok(VersionedWrite::Conflict)
                }
            });
        let rows = vec![ended.clone()];
        repo.expect_list_expirable()
            .with(eq(today))
            .returning(move |_| Ok(rows.clone()));
        let expired_row = ended.clone();
        repo.expect_expire()
            .withf(move |id, version, _| *id == ended_id && *version == 1)
            .times(1)
            .returning(move |_, _, _| Ok(VersionedWrite::Applied(expired_row.clone())));

        let mut events = MockDomainEventPublisher::new();
        events
            .expect_publish()
            .withf(move |e| {
                matches!(e, DomainEvent::MembershipFrozen { membership_id, .. } if *membership_id == frozen_window.membership_id)
            })
            .times(1)
            .return_const(());
        events
            .expect_publish()
            .withf(move |e| *e == DomainEvent::MembershipExpired { membership_id: ended_id })
            .times(1)
            .return_const(());

        let report = usecase(repo, events).run(today).await.unwrap();

        assert_eq!(
            report,
            SweepReport {
                scanned: 3,
                frozen: 1,
                expired: 1,
                conflicts: 1,
                failed: 0,
            }
        );
    }

    #[tokio::test]
    async fn one_failed_row_does_not_stop_the_run() {
        let first = active_membership(date(2024, 2, 1));
        let second = active_membership(date(2024, 2, 2));
        let first_id = first.id;

        let mut repo = MockMembershipRepository::new();
        repo.expect_list_due_freezes().returning(|_| Ok(Vec::new()));
        let rows = vec![first.clone(), second.clone()];
        repo.expect_list_expirable()
            .returning(move |_| Ok(rows.clone()));
        repo.expect_expire().times(2).returning(move |id, _, _| {
            if id == first_id {
                Err(anyhow::anyhow!("deadlock detected"))
            } else {
                Ok(VersionedWrite::Applied(second.clone()))
            }
        });

        let mut events = MockDomainEventPublisher::new();
        events.expect_publish().times(1).return_const(());

        let report = usecase(repo, events).run_now().await.unwrap();

        assert_eq!(report.expired, 1);
        assert_eq!(report.failed, 1);
    }

    #[tokio::test]
    async fn second_window_for_same_membership_waits() {
        let membership_id = Uuid::new_v4();

        let mut repo = MockMembershipRepository::new();
        let windows = vec![due(membership_id), due(membership_id)];
        repo.expect_list_due_freezes()
            .returning(move |_| Ok(windows.clone()));
        let row = active_membership(date(2024, 3, 1));
        repo.expect_apply_due_freeze()
            .times(1)
            .returning(move |_, _| Ok(VersionedWrite::Applied(row.clone())));
        repo.expect_list_expirable().returning(|_| Ok(Vec::new()));

        let mut events = MockDomainEventPublisher::new();
        events.expect_publish().times(1).return_const(());

        let report = usecase(repo, events).run_now().await.unwrap();

        assert_eq!(report.scanned, 2);
        assert_eq!(report.frozen, 1);
    }

    #[tokio::test]
    async fn listing_failure_aborts_the_run() {
        let mut repo = MockMembershipRepository::new();
        repo.expect_list_due_freezes()
            .returning(|_| Err(anyhow::anyhow!("connection refused")));
        repo.expect_list_expirable().never();

        let result = usecase(repo, MockDomainEventPublisher::new())
            .run_now()
            .await;

        assert!(result.is_err());
    }
}
