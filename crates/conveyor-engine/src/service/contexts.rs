//! In-process coordination of deploy calls per release.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::Mutex as AsyncMutex;
use tokio_util::sync::CancellationToken;

const TRACING_TARGET: &str = "conveyor_engine::trigger";

/// Key identifying the release a trigger acts on.
type ReleaseKey = (i64, i64);

/// Registry of in-flight deploy calls, keyed by pipeline and environment.
///
/// Serializes driver calls per release and lets a newer trigger preempt
/// the current holder. Registering cancels the token of the previous
/// registrant before the new trigger waits for its turn, so an overtaken
/// driver call aborts instead of running out its full budget.
#[derive(Debug, Default, Clone)]
pub(crate) struct ReleaseContexts {
    inner: Arc<Mutex<HashMap<ReleaseKey, ReleaseSlot>>>,
}

#[derive(Debug, Default)]
struct ReleaseSlot {
    serialize: Arc<AsyncMutex<()>>,
    current: Option<ActiveRelease>,
}

#[derive(Debug)]
struct ActiveRelease {
    wfr_id: i64,
    cancel: CancellationToken,
}

impl ReleaseContexts {
    /// Registers a trigger for the release and returns the lock that
    /// serializes its driver call.
    ///
    /// Cancels the previously registered trigger, if any.
    pub(crate) fn begin(
        &self,
        pipeline_id: i64,
        environment_id: i64,
        wfr_id: i64,
        cancel: CancellationToken,
    ) -> Arc<AsyncMutex<()>> {
        let mut slots = self.lock();
        let slot = slots.entry((pipeline_id, environment_id)).or_default();

        if let Some(previous) = slot.current.replace(ActiveRelease { wfr_id, cancel }) {
            tracing::debug!(
                target: TRACING_TARGET,
                pipeline_id,
                environment_id,
                overtaken_wfr_id = previous.wfr_id,
                wfr_id,
                "Preempting in-flight deploy call"
            );
            previous.cancel.cancel();
        }

        slot.serialize.clone()
    }

    /// Clears the registration left by [`begin`], ignoring stale calls
    /// when a newer trigger has already taken over the key.
    ///
    /// [`begin`]: Self::begin
    pub(crate) fn finish(&self, pipeline_id: i64, environment_id: i64, wfr_id: i64) {
        let mut slots = self.lock();
        let Some(slot) = slots.get_mut(&(pipeline_id, environment_id)) else {
            return;
        };

        if slot
            .current
            .as_ref()
            .is_some_and(|active| active.wfr_id == wfr_id)
        {
            slot.current = None;
        }

        // The map's clone is the only one left once no trigger holds or
        // waits on the lock.
        if slot.current.is_none() && Arc::strong_count(&slot.serialize) == 1 {
            slots.remove(&(pipeline_id, environment_id));
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ReleaseKey, ReleaseSlot>> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    #[cfg(test)]
    fn slot_count(&self) -> usize {
        self.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newer_trigger_cancels_previous() {
        let contexts = ReleaseContexts::default();
        let first = CancellationToken::new();
        let second = CancellationToken::new();

        contexts.begin(7, 3, 101, first.clone());
        assert!(!first.is_cancelled());

        contexts.begin(7, 3, 102, second.clone());
        assert!(first.is_cancelled());
        assert!(!second.is_cancelled());
    }

    #[test]
    fn releases_do_not_preempt_across_keys() {
        let contexts = ReleaseContexts::default();
        let first = CancellationToken::new();
        let second = CancellationToken::new();

        contexts.begin(7, 3, 101, first.clone());
        contexts.begin(7, 4, 102, second.clone());

        assert!(!first.is_cancelled());
        assert!(!second.is_cancelled());
    }

    #[test]
    fn stale_finish_keeps_newer_registration() {
        let contexts = ReleaseContexts::default();
        let second = CancellationToken::new();

        let lock_first = contexts.begin(7, 3, 101, CancellationToken::new());
        contexts.begin(7, 3, 102, second.clone());

        // The overtaken trigger finishing must not clear the winner.
        drop(lock_first);
        contexts.finish(7, 3, 101);

        let third = CancellationToken::new();
        contexts.begin(7, 3, 103, third);
        assert!(second.is_cancelled());
    }

    #[test]
    fn lock_is_shared_per_key() {
        let contexts = ReleaseContexts::default();

        let a = contexts.begin(7, 3, 101, CancellationToken::new());
        let b = contexts.begin(7, 3, 102, CancellationToken::new());
        assert!(Arc::ptr_eq(&a, &b));

        let c = contexts.begin(8, 3, 103, CancellationToken::new());
        assert!(!Arc::ptr_eq(&a, &c));
    }

    #[test]
    fn finished_slots_are_dropped() {
        let contexts = ReleaseContexts::default();

        let lock = contexts.begin(7, 3, 101, CancellationToken::new());
        assert_eq!(contexts.slot_count(), 1);

        drop(lock);
        contexts.finish(7, 3, 101);
        assert_eq!(contexts.slot_count(), 0);
    }

    #[tokio::test]
    async fn driver_calls_serialize_per_key() {
        let contexts = ReleaseContexts::default();

        let first = contexts.begin(7, 3, 101, CancellationToken::new());
        let second = contexts.begin(7, 3, 102, CancellationToken::new());

        let guard = first.lock().await;
        assert!(second.try_lock().is_err());
        drop(guard);
        assert!(second.try_lock().is_ok());
    }
}
