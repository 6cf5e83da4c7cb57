//! Driver that invokes the intake loop until shutdown.

use cosmos_hdfs::StorageBackend;
use std::time::Duration;
use tokio::sync::watch;

use crate::channel::Channel;
use crate::sink::{IntakeLoop, Status};

/// Linear backoff: each consecutive `Backoff` adds `step`, capped at `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub step: Duration,
    pub max: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            step: Duration::from_millis(1000),
            max: Duration::from_millis(5000),
        }
    }
}

impl BackoffPolicy {
    pub fn new(step: Duration, max: Duration) -> Self {
        Self { step, max }
    }

    /// Sleep before the next attempt after `consecutive` backoffs in a row.
    pub fn delay(&self, consecutive: u32) -> Duration {
        self.step.saturating_mul(consecutive).min(self.max)
    }
}

/// Repeatedly drives an [`IntakeLoop`], one transaction at a time.
#[derive(Debug)]
pub struct SinkRunner<C, B> {
    sink: IntakeLoop<C, B>,
    policy: BackoffPolicy,
}

impl<C: Channel, B: StorageBackend> SinkRunner<C, B> {
    pub fn new(sink: IntakeLoop<C, B>, policy: BackoffPolicy) -> Self {
        Self { sink, policy }
    }

    pub fn sink(&self) -> &IntakeLoop<C, B> {
        &self.sink
    }

    /// Runs until `shutdown` becomes `true` or its sender is dropped.
    ///
    /// A panic inside the sink is not caught here; it ends the task so the
    /// owner can decide whether to restart.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        self.sink.start().await;
        tracing::info!(
            step_ms = self.policy.step.as_millis() as u64,
            max_ms = self.policy.max.as_millis() as u64,
            "sink runner started"
        );

        let mut consecutive_backoffs: u32 = 0;
        loop {
            if *shutdown.borrow() {
                break;
            }

            match self.sink.process().await {
                Status::Ready => consecutive_backoffs = 0,
                Status::Backoff => {
                    consecutive_backoffs = consecutive_backoffs.saturating_add(1);
                    let delay = self.policy.delay(consecutive_backoffs);
                    tokio::select! {
                        () = tokio::time::sleep(delay) => {}
                        changed = shutdown.changed() => {
                            if changed.is_err() {
                                break;
                            }
                        }
                    }
                }
            }
        }

        tracing::info!("sink runner stopped");
    }
}
