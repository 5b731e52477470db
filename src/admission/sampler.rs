use std::{sync::Arc, time::Duration};

use log::debug;
use tokio::{
    sync::watch,
    time::{self, MissedTickBehavior},
};

use super::ResourceGauge;

/// Spawns a task that publishes the CPU usage every `interval`.
///
/// The task stops once every receiver is dropped.
///
/// # Arguments
/// * `gauge` - The CPU measurement source.
/// * `interval` - The sampling period.
///
/// # Returns
/// The receiving end of the samples, holding the first sample already.
pub fn spawn_sampler(gauge: Arc<dyn ResourceGauge>, interval: Duration) -> watch::Receiver<f32> {
    let (tx, rx) = watch::channel(gauge.cpu_percent());

    tokio::spawn(async move {
        let mut ticker = time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    tx.send_replace(gauge.cpu_percent());
                }
                _ = tx.closed() => break,
            }
        }

        debug!("cpu sampler stopped");
    });

    rx
}
