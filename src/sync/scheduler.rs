//! Keyed, cancellable delayed tasks.
//!
//! Arming a key replaces (and aborts) whatever was pending for it. Once a
//! timer elapses its task leaves the table before running, so re-arming the
//! key never cancels work that has already been dispatched.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;

struct Slot {
    generation: u64,
    handle: JoinHandle<()>,
}

pub struct DebounceScheduler<K> {
    delay: Duration,
    slots: Mutex<HashMap<K, Slot>>,
    generations: AtomicU64,
}

impl<K> DebounceScheduler<K>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
{
    pub fn new(delay: Duration) -> Self {
        Self { delay, slots: Mutex::new(HashMap::new()), generations: AtomicU64::new(0) }
    }

    /// Runs `task` after the quiet window unless `key` is armed or disarmed again first.
    pub fn arm<F>(self: &Arc<Self>, key: K, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let generation = self.generations.fetch_add(1, Ordering::Relaxed) + 1;
        let this = Arc::clone(self);
        let slot_key = key.clone();
        let delay = self.delay;

        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if this.release(&slot_key, generation) {
                task.await;
            }
        });
        if let Some(previous) = slots.insert(key, Slot { generation, handle }) {
            previous.handle.abort();
        }
    }

    /// Cancels the pending timer for `key`, if any. Returns whether one was pending.
    pub fn disarm(&self, key: &K) -> bool {
        let removed = self.slots.lock().unwrap_or_else(PoisonError::into_inner).remove(key);
        match removed {
            Some(slot) => {
                slot.handle.abort();
                true
            }
            None => false,
        }
    }

    pub fn is_armed(&self, key: &K) -> bool {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner).contains_key(key)
    }

    fn release(&self, key: &K, generation: u64) -> bool {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        match slots.get(key) {
            Some(slot) if slot.generation == generation => {
                slots.remove(key);
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[tokio::test(start_paused = true)]
    async fn test_rearming_restarts_the_window() {
        let scheduler = Arc::new(DebounceScheduler::new(Duration::from_millis(700)));
        let fired = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let fired = fired.clone();
            scheduler.arm("line-1", async move { fired.fetch_add(1, Ordering::SeqCst); });
            tokio::time::sleep(Duration::from_millis(400)).await;
        }
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert!(scheduler.is_armed(&"line-1"));

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(!scheduler.is_armed(&"line-1"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_keys_are_independent_and_disarmable() {
        let scheduler = Arc::new(DebounceScheduler::new(Duration::from_millis(100)));
        let fired = Arc::new(AtomicUsize::new(0));
        for key in ["a", "b"] {
            let fired = fired.clone();
            scheduler.arm(key, async move { fired.fetch_add(1, Ordering::SeqCst); });
        }
        assert!(scheduler.disarm(&"a"));
        assert!(!scheduler.disarm(&"a"));

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }
}
