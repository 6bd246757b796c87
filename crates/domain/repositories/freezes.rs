use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;

use crate::domain::value_objects::memberships::{FreezeReservation, ReservationOutcome};

#[automock]
#[async_trait]
pub trait FreezeRepository: Send + Sync {
    /// Locks the membership, re-checks overlap and allowance, then writes the freeze window
    /// together with its approval envelope. Nothing is written unless both are.
    async fn reserve_freeze(&self, reservation: FreezeReservation) -> Result<ReservationOutcome>;
}
