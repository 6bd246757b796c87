use anyhow::Result;
use std::{sync::Arc, time::Duration};
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

use crate::usecases::membership_sweep::MembershipSweepUseCase;

pub async fn run(usecase: Arc<MembershipSweepUseCase>, interval: Duration) -> Result<()> {
    info!(
        interval_seconds = interval.as_secs(),
        "membership_sweep: starting worker loop"
    );

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        if let Err(e) = usecase.run_now().await {
            error!(error = ?e, "membership_sweep: run aborted");
        }
    }
}
