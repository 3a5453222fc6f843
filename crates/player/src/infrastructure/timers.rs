//! Keyed, cancellable one-shot timers.
//!
//! Each timer is a spawned task that sleeps and then reports back on a channel
//! owned by the session loop. Scheduling a key that is already armed aborts
//! the earlier task, so at most one timer per key is ever outstanding. A task
//! may have reported just before it was aborted; `take_fired` drops such stale
//! reports by comparing generations.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::AbortHandle;

/// Identifies what a timer is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKey {
    AutoHunt,
    PendingAction,
    /// Freshness highlight of one message group
    Freshness(u64),
    SessionEnd,
}

/// Report sent when a timer elapses
#[derive(Debug)]
pub struct TimerFired<P> {
    pub key: TimerKey,
    generation: u64,
    payload: P,
}

struct ArmedTimer {
    generation: u64,
    abort: AbortHandle,
}

pub struct Scheduler<P> {
    fired_tx: mpsc::UnboundedSender<TimerFired<P>>,
    armed: HashMap<TimerKey, ArmedTimer>,
    next_generation: u64,
}

impl<P: Send + 'static> Scheduler<P> {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<TimerFired<P>>) {
        let (fired_tx, fired_rx) = mpsc::unbounded_channel();
        let scheduler = Self {
            fired_tx,
            armed: HashMap::new(),
            next_generation: 0,
        };
        (scheduler, fired_rx)
    }

    /// Arm `key` to fire after `delay`, replacing any timer already armed under it.
    pub fn schedule(&mut self, key: TimerKey, delay: Duration, payload: P) {
        self.cancel(key);

        self.next_generation += 1;
        let generation = self.next_generation;
        let tx = self.fired_tx.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(TimerFired {
                key,
                generation,
                payload,
            });
        });

        tracing::trace!(?key, delay_ms = delay.as_millis() as u64, "Timer armed");
        self.armed.insert(
            key,
            ArmedTimer {
                generation,
                abort: task.abort_handle(),
            },
        );
    }

    /// Disarm `key`. Returns whether a timer was outstanding.
    pub fn cancel(&mut self, key: TimerKey) -> bool {
        match self.armed.remove(&key) {
            Some(timer) => {
                timer.abort.abort();
                tracing::trace!(?key, "Timer cancelled");
                true
            }
            None => false,
        }
    }

    pub fn cancel_all(&mut self) {
        for (_, timer) in self.armed.drain() {
            timer.abort.abort();
        }
    }

    /// Accept a fired report, returning its payload unless it was superseded.
    pub fn take_fired(&mut self, fired: TimerFired<P>) -> Option<P> {
        let current = self.armed.get(&fired.key)?;
        if current.generation != fired.generation {
            tracing::trace!(key = ?fired.key, "Ignoring stale timer");
            return None;
        }
        self.armed.remove(&fired.key);
        Some(fired.payload)
    }

    pub fn is_armed(&self, key: TimerKey) -> bool {
        self.armed.contains_key(&key)
    }

    pub fn armed_count(&self) -> usize {
        self.armed.len()
    }
}

impl<P> Drop for Scheduler<P> {
    fn drop(&mut self) {
        for (_, timer) in self.armed.drain() {
            timer.abort.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_timer_fires_after_delay() {
        let (mut scheduler, mut fired) = Scheduler::new();
        let start = tokio::time::Instant::now();

        scheduler.schedule(TimerKey::PendingAction, Duration::from_millis(50), "go");

        let report = fired.recv().await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(50));
        assert_eq!(scheduler.take_fired(report), Some("go"));
        assert!(!scheduler.is_armed(TimerKey::PendingAction));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rescheduling_keeps_one_outstanding() {
        let (mut scheduler, mut fired) = Scheduler::new();

        for i in 0..10 {
            scheduler.schedule(TimerKey::AutoHunt, Duration::from_millis(1_000), i);
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        assert_eq!(scheduler.armed_count(), 1);

        let report = fired.recv().await.unwrap();
        assert_eq!(scheduler.take_fired(report), Some(9));

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(fired.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_timer_never_fires() {
        let (mut scheduler, mut fired) = Scheduler::new();

        scheduler.schedule(TimerKey::SessionEnd, Duration::from_millis(1_500), ());
        assert!(scheduler.cancel(TimerKey::SessionEnd));
        assert!(!scheduler.cancel(TimerKey::SessionEnd));

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(fired.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_report_is_ignored() {
        let (mut scheduler, mut fired) = Scheduler::new();

        scheduler.schedule(TimerKey::Freshness(1), Duration::from_millis(10), "old");
        tokio::time::sleep(Duration::from_millis(20)).await;
        // Report is queued but not yet consumed when the key is re-armed
        scheduler.schedule(TimerKey::Freshness(1), Duration::from_millis(10), "new");

        let stale = fired.recv().await.unwrap();
        assert_eq!(scheduler.take_fired(stale), None);

        let current = fired.recv().await.unwrap();
        assert_eq!(scheduler.take_fired(current), Some("new"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_keys_are_independent() {
        let (mut scheduler, _fired) = Scheduler::<()>::new();

        scheduler.schedule(TimerKey::Freshness(1), Duration::from_secs(2), ());
        scheduler.schedule(TimerKey::Freshness(2), Duration::from_secs(2), ());
        scheduler.schedule(TimerKey::AutoHunt, Duration::from_secs(1), ());
        assert_eq!(scheduler.armed_count(), 3);

        scheduler.cancel_all();
        assert_eq!(scheduler.armed_count(), 0);
    }
}
