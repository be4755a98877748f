use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval, Interval, MissedTickBehavior};

use crate::state::{AppState, RefreshOutcome};

fn ticker(rate_ms: u64) -> Interval {
    let mut ticker = interval(Duration::from_millis(rate_ms.max(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

/// Periodic refresh task. Ticks never overlap: the next tick is only awaited
/// after the previous refresh finished. Frozen stores skip ticks.
pub async fn run_refresh_loop(store: AppState, mut rate: watch::Receiver<u64>) {
    let mut current = *rate.borrow_and_update();
    let mut timer = ticker(current);
    log::info!("Refreshing process table every {} ms", current);

    loop {
        tokio::select! {
            _ = timer.tick() => {
                if let RefreshOutcome::Failed(e) = store.tick().await {
                    log::debug!("Scheduled refresh failed: {}", e);
                }
            }
            changed = rate.changed() => {
                if changed.is_err() {
                    log::debug!("Refresh rate channel closed, stopping refresh loop");
                    break;
                }
                let next = *rate.borrow_and_update();
                if next != current {
                    log::info!("Refresh rate changed from {} ms to {} ms", current, next);
                    current = next;
                    timer = ticker(current);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TableSettings;
    use crate::state::tests::{chrome, ScriptedBackend};
    use crate::state::new_state;
    use std::sync::atomic::Ordering;
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn ticks_at_the_configured_rate_and_skips_while_frozen() {
        let backend = Arc::new(ScriptedBackend::new());
        for _ in 0..10 {
            backend.push_snapshot(vec![chrome()]);
        }
        let store = new_state(backend.clone(), TableSettings::default());
        let task = tokio::spawn(run_refresh_loop(store.clone(), store.refresh_rate_updates()));

        // first tick fires immediately, then one per second
        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert_eq!(backend.fetches.load(Ordering::SeqCst), 3);

        store.set_frozen(true);
        tokio::time::sleep(Duration::from_millis(3000)).await;
        assert_eq!(backend.fetches.load(Ordering::SeqCst), 3);

        task.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn picks_up_a_new_refresh_rate() {
        let backend = Arc::new(ScriptedBackend::new());
        for _ in 0..10 {
            backend.push_snapshot(vec![chrome()]);
        }
        let store = new_state(backend.clone(), TableSettings::default());
        let task = tokio::spawn(run_refresh_loop(store.clone(), store.refresh_rate_updates()));

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(backend.fetches.load(Ordering::SeqCst), 1);

        store
            .update_settings(TableSettings {
                refresh_rate_ms: 10000,
                ..TableSettings::default()
            })
            .unwrap();
        // the rebuilt interval fires once right away
        tokio::time::sleep(Duration::from_millis(5000)).await;
        assert_eq!(backend.fetches.load(Ordering::SeqCst), 2);

        tokio::time::sleep(Duration::from_millis(6000)).await;
        assert_eq!(backend.fetches.load(Ordering::SeqCst), 3);

        task.abort();
    }
}
