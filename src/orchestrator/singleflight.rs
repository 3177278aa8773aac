//! Single-flight: at most one computation per fingerprint at a time;
//! joiners block on a condvar and copy the first caller's result.

use super::types::SynthesisResult;
use std::collections::HashMap;
use std::sync::{Arc, Condvar, Mutex};

struct Slot {
    lock: Mutex<Option<SynthesisResult>>,
    cond: Condvar,
}

/// Keyed map of in-flight computations, guarded by a single mutex.
#[derive(Default)]
pub struct SingleFlight {
    inflight: Mutex<HashMap<String, Arc<Slot>>>,
}

/// Handle returned by [`SingleFlight::enter`]: either the caller must
/// compute and call [`Token::finish`], or the result is already on its way
/// from another caller and the token resolves to `Joined`.
pub enum Token {
    /// This caller won the race and must compute the result.
    Leader(LeaderGuard),
    /// Another caller is already computing; blocks until it's done.
    Joined(SynthesisResult),
}

pub struct LeaderGuard {
    key: String,
    slot: Arc<Slot>,
}

impl LeaderGuard {
    /// Publish the computed result, waking any joiners, and remove this
    /// fingerprint from the in-flight map. `flight` must be the
    /// [`SingleFlight`] that produced this guard via [`SingleFlight::enter`].
    pub fn finish(self, flight: &SingleFlight, result: SynthesisResult) -> SynthesisResult {
        {
            let mut guard = self.slot.lock.lock().expect("single-flight slot poisoned");
            *guard = Some(result.clone());
        }
        self.slot.cond.notify_all();
        let mut inflight = flight.inflight.lock().expect("single-flight map poisoned");
        inflight.remove(&self.key);
        result
    }
}

impl SingleFlight {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter the single-flight section for `key`. The first caller for a
    /// given key becomes the leader and must call `finish`; subsequent
    /// callers block until the leader finishes and receive its result.
    pub fn enter(&self, key: &str) -> Token {
        let mut inflight = self.inflight.lock().expect("single-flight map poisoned");
        if let Some(slot) = inflight.get(key).cloned() {
            drop(inflight);
            let mut guard = slot.lock.lock().expect("single-flight slot poisoned");
            while guard.is_none() {
                guard = slot.cond.wait(guard).expect("single-flight condvar poisoned");
            }
            return Token::Joined(guard.clone().expect("result present after wait"));
        }

        let slot = Arc::new(Slot {
            lock: Mutex::new(None),
            cond: Condvar::new(),
        });
        inflight.insert(key.to_owned(), slot.clone());
        Token::Leader(LeaderGuard {
            key: key.to_owned(),
            slot,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Barrier;
    use std::thread;

    #[test]
    fn leader_computes_joiner_copies_result() {
        let flight = Arc::new(SingleFlight::new());
        let compute_count = Arc::new(AtomicUsize::new(0));
        let barrier = Arc::new(Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let flight = Arc::clone(&flight);
                let compute_count = Arc::clone(&compute_count);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    match flight.enter("same-key") {
                        Token::Leader(guard) => {
                            compute_count.fetch_add(1, Ordering::SeqCst);
                            thread::sleep(std::time::Duration::from_millis(20));
                            let result = SynthesisResult::default();
                            guard.finish(&flight, result)
                        }
                        Token::Joined(result) => result,
                    }
                })
            })
            .collect();

        for h in handles {
            h.join().expect("thread panicked");
        }

        assert_eq!(compute_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn distinct_keys_do_not_contend() {
        let flight = SingleFlight::new();
        let token_a = flight.enter("a");
        let token_b = flight.enter("b");
        assert!(matches!(token_a, Token::Leader(_)));
        assert!(matches!(token_b, Token::Leader(_)));
    }
}
