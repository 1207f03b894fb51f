use std::{future::Future, pin::Pin, sync::Arc};

use chrono::{Duration as ChronoDuration, NaiveDateTime, Utc};
use dashmap::DashMap;
use thiserror::Error;
use tokio::{
    sync::oneshot,
    task::JoinHandle,
    time::{sleep_until, Duration, Instant},
};
use tracing::debug;

/// Type alias for the trigger fire callback to reduce type complexity
type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
pub type FireCallback = Arc<dyn Fn(i32) -> BoxFuture<'static, ()> + Send + Sync>;

#[derive(Debug, Error)]
#[error("cannot schedule a trigger at {fire_at}: instant is in the past")]
pub struct InvalidScheduleError {
    pub fire_at: NaiveDateTime,
}

struct Trigger {
    fire_at: NaiveDateTime,
    handle: JoinHandle<()>,
}

/// In-memory set of pending one-shot triggers, keyed by job id.
///
/// Each trigger is a spawned task sleeping until its target instant; firing
/// runs on that task, so one job's slow execution never blocks another's.
/// At most one trigger exists per job id: scheduling the same id again
/// cancels the previous trigger and arms the new one.
///
/// Triggers live only in process memory. A restart loses every trigger
/// whose job is still pending; `serve` re-arms the ones whose instant is
/// still in the future (see `commands::serve`).
#[derive(Clone)]
pub struct TriggerScheduler {
    triggers: Arc<DashMap<i32, Trigger>>,
    on_fire: FireCallback,
    past_tolerance: ChronoDuration,
}

impl TriggerScheduler {
    #[must_use]
    pub fn new(on_fire: FireCallback, past_tolerance_seconds: u64) -> Self {
        let tolerance_seconds = past_tolerance_seconds.try_into().unwrap_or(i64::MAX);
        Self {
            triggers: Arc::new(DashMap::new()),
            on_fire,
            past_tolerance: ChronoDuration::seconds(tolerance_seconds),
        }
    }

    /// Check whether an instant is still schedulable without arming anything.
    ///
    /// Instants further in the past than the configured tolerance are
    /// rejected outright. Instants inside the tolerance window are accepted
    /// and will fire immediately once armed.
    pub fn check_schedulable(&self, fire_at: NaiveDateTime) -> Result<(), InvalidScheduleError> {
        let now = Utc::now().naive_utc();
        if fire_at < now - self.past_tolerance {
            return Err(InvalidScheduleError { fire_at });
        }
        Ok(())
    }

    /// Arm a one-shot trigger for `job_id` at `fire_at`.
    ///
    /// Replaces (and cancels) any pending trigger for the same job id, so
    /// only the latest registration ever fires.
    pub fn schedule(
        &self,
        job_id: i32,
        fire_at: NaiveDateTime,
    ) -> Result<(), InvalidScheduleError> {
        self.check_schedulable(fire_at)?;

        let now = Utc::now().naive_utc();
        let delay = (fire_at - now).to_std().unwrap_or(Duration::ZERO);
        let deadline = Instant::now() + delay;

        // The task must not run ahead of its own map entry: a zero-delay
        // trigger would otherwise fire (and try to remove itself) before
        // the insert below, leaving a stale entry behind. The task waits
        // for this signal, sent only after the entry is in place.
        let (armed_sender, armed_receiver) = oneshot::channel();

        let handle = tokio::spawn({
            let triggers = Arc::clone(&self.triggers);
            let on_fire = Arc::clone(&self.on_fire);
            async move {
                if armed_receiver.await.is_err() {
                    return;
                }
                sleep_until(deadline).await;
                // Remove our own entry, but only if it was not replaced
                // by a newer registration in the meantime.
                triggers.remove_if(&job_id, |_, trigger| trigger.fire_at == fire_at);
                debug!("Trigger for job {} fired at {}", job_id, fire_at);
                on_fire(job_id).await;
            }
        });

        if let Some(previous) = self.triggers.insert(job_id, Trigger { fire_at, handle }) {
            previous.handle.abort();
            debug!("Replaced pending trigger for job {}", job_id);
        } else {
            debug!("Armed trigger for job {} at {}", job_id, fire_at);
        }

        let _ = armed_sender.send(());

        Ok(())
    }

    /// Cancel a pending trigger; no-op if none exists for `job_id`.
    pub fn cancel(&self, job_id: i32) {
        if let Some((_, trigger)) = self.triggers.remove(&job_id) {
            trigger.handle.abort();
            debug!("Cancelled pending trigger for job {}", job_id);
        }
    }

    /// Target instant of the pending trigger for `job_id`, if one is armed.
    #[must_use]
    pub fn fire_at(&self, job_id: i32) -> Option<NaiveDateTime> {
        self.triggers.get(&job_id).map(|trigger| trigger.fire_at)
    }

    /// Number of currently armed triggers.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.triggers.len()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use super::*;

    fn counting_callback() -> (FireCallback, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = Arc::clone(&count);
        let callback: FireCallback = Arc::new(move |_job_id| {
            let count = Arc::clone(&count_clone);
            Box::pin(async move {
                count.fetch_add(1, Ordering::SeqCst);
            })
        });
        (callback, count)
    }

    fn recording_callback() -> (FireCallback, Arc<Mutex<Vec<i32>>>) {
        let fired = Arc::new(Mutex::new(Vec::new()));
        let fired_clone = Arc::clone(&fired);
        let callback: FireCallback = Arc::new(move |job_id| {
            let fired = Arc::clone(&fired_clone);
            Box::pin(async move {
                fired.lock().unwrap().push(job_id);
            })
        });
        (callback, fired)
    }

    fn in_seconds(seconds: i64) -> NaiveDateTime {
        Utc::now().naive_utc() + ChronoDuration::seconds(seconds)
    }

    #[tokio::test(start_paused = true)]
    async fn fires_exactly_once_at_the_target_instant() {
        let (callback, count) = counting_callback();
        let scheduler = TriggerScheduler::new(callback, 30);

        let fire_at = in_seconds(60);
        scheduler.schedule(1, fire_at).unwrap();
        assert_eq!(scheduler.fire_at(1), Some(fire_at));
        assert_eq!(scheduler.pending_count(), 1);

        tokio::time::sleep(Duration::from_secs(59)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(scheduler.pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn rejects_instants_past_the_tolerance() {
        let (callback, count) = counting_callback();
        let scheduler = TriggerScheduler::new(callback, 30);

        let err = scheduler.schedule(1, in_seconds(-120)).unwrap_err();
        assert!(err.to_string().contains("in the past"));
        assert_eq!(scheduler.pending_count(), 0);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn instants_within_the_tolerance_fire_immediately() {
        let (callback, count) = counting_callback();
        let scheduler = TriggerScheduler::new(callback, 30);

        scheduler.schedule(1, in_seconds(-5)).unwrap();

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn immediate_triggers_leave_no_entries_behind() {
        let (callback, count) = counting_callback();
        let scheduler = TriggerScheduler::new(callback, 30);

        // Zero-delay triggers fire as soon as they are armed, racing the
        // arming itself; none of them may leave a stale map entry.
        for job_id in 0..200 {
            scheduler.schedule(job_id, in_seconds(-5)).unwrap();
        }

        for _ in 0..100 {
            if count.load(Ordering::SeqCst) == 200 && scheduler.pending_count() == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        assert_eq!(count.load(Ordering::SeqCst), 200);
        assert_eq!(scheduler.pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_prevents_firing() {
        let (callback, count) = counting_callback();
        let scheduler = TriggerScheduler::new(callback, 30);

        scheduler.schedule(1, in_seconds(60)).unwrap();
        scheduler.cancel(1);
        assert_eq!(scheduler.pending_count(), 0);

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_of_unknown_job_is_a_noop() {
        let (callback, _count) = counting_callback();
        let scheduler = TriggerScheduler::new(callback, 30);

        scheduler.cancel(42);
        assert_eq!(scheduler.pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn rescheduling_replaces_the_previous_trigger() {
        let (callback, count) = counting_callback();
        let scheduler = TriggerScheduler::new(callback, 30);

        let first = in_seconds(60);
        let second = in_seconds(180);
        scheduler.schedule(1, first).unwrap();
        scheduler.schedule(1, second).unwrap();

        assert_eq!(scheduler.pending_count(), 1);
        assert_eq!(scheduler.fire_at(1), Some(second));

        // Past the first instant: the replaced trigger must not fire.
        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn jobs_at_the_same_instant_fire_independently() {
        let (callback, fired) = recording_callback();
        let scheduler = TriggerScheduler::new(callback, 30);

        let fire_at = in_seconds(60);
        scheduler.schedule(1, fire_at).unwrap();
        scheduler.schedule(2, fire_at).unwrap();
        assert_eq!(scheduler.pending_count(), 2);

        tokio::time::sleep(Duration::from_secs(120)).await;

        let mut ids = fired.lock().unwrap().clone();
        ids.sort_unstable();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(scheduler.pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn one_panicking_callback_does_not_block_others() {
        let fired = Arc::new(Mutex::new(Vec::new()));
        let fired_clone = Arc::clone(&fired);
        let callback: FireCallback = Arc::new(move |job_id| {
            let fired = Arc::clone(&fired_clone);
            Box::pin(async move {
                assert!(job_id != 1, "job 1 blows up");
                fired.lock().unwrap().push(job_id);
            })
        });
        let scheduler = TriggerScheduler::new(callback, 30);

        let fire_at = in_seconds(60);
        scheduler.schedule(1, fire_at).unwrap();
        scheduler.schedule(2, fire_at).unwrap();

        tokio::time::sleep(Duration::from_secs(120)).await;

        assert_eq!(fired.lock().unwrap().clone(), vec![2]);
    }
}
