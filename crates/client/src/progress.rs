//! Transfer progress observation.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Key under which instantaneous throughput (bytes/second) is published in
/// [`ProgressSnapshot::user_info`].
pub const THROUGHPUT_KEY: &str = "throughput";

const THROUGHPUT_INTERVAL: Duration = Duration::from_millis(100);

/// Shared transfer progress: mutated in place by the engine, read by the
/// caller. `completed` is monotonically non-decreasing for the lifetime of
/// the transfer.
#[derive(Debug, Default)]
pub struct TransferProgress {
    state: Mutex<State>,
}

#[derive(Debug, Default)]
struct State {
    total: u64,
    completed: u64,
    user_info: HashMap<String, f64>,
    window: Option<Window>,
}

#[derive(Clone, Copy, Debug)]
struct Window {
    at: Instant,
    completed: u64,
}

/// Point-in-time copy of a [`TransferProgress`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ProgressSnapshot {
    pub total: u64,
    pub completed: u64,
    pub user_info: HashMap<String, f64>,
}

impl TransferProgress {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_total(&self, total: u64) {
        self.state.lock().unwrap().total = total;
    }

    /// Record the absolute number of bytes transferred so far. Values lower
    /// than the current count are ignored; throughput is recomputed at most
    /// every 100 ms.
    pub fn record(&self, completed: u64) {
        let mut state = self.state.lock().unwrap();
        state.completed = state.completed.max(completed);
        let now = Instant::now();
        match state.window {
            None => {
                state.window = Some(Window {
                    at: now,
                    completed: state.completed,
                });
            }
            Some(window) => {
                let elapsed = now.duration_since(window.at);
                if elapsed >= THROUGHPUT_INTERVAL {
                    let delta = state.completed - window.completed;
                    let throughput = delta as f64 / elapsed.as_secs_f64();
                    state.user_info.insert(THROUGHPUT_KEY.to_owned(), throughput);
                    state.window = Some(Window {
                        at: now,
                        completed: state.completed,
                    });
                }
            }
        }
    }

    /// Mark the transfer finished. A transfer with an unknown total adopts
    /// the completed byte count as its total.
    pub fn finish(&self) {
        let mut state = self.state.lock().unwrap();
        state.total = state.total.max(state.completed);
        state.completed = state.total;
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        let state = self.state.lock().unwrap();
        ProgressSnapshot {
            total: state.total,
            completed: state.completed,
            user_info: state.user_info.clone(),
        }
    }

    /// Completed share in `[0, 1]`. Transfers with an unknown total report 0
    /// until finished.
    pub fn fraction(&self) -> f64 {
        let state = self.state.lock().unwrap();
        if state.total == 0 {
            return 0.0;
        }
        state.completed as f64 / state.total as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn completed_never_decreases() {
        let progress = TransferProgress::new();
        progress.set_total(100);
        progress.record(40);
        progress.record(10);
        assert_eq!(progress.snapshot().completed, 40);
    }

    #[test]
    fn finish_reconciles_unknown_totals() {
        let progress = TransferProgress::new();
        progress.record(17);
        progress.finish();
        let snapshot = progress.snapshot();
        assert_eq!((snapshot.total, snapshot.completed), (17, 17));
    }

    #[test]
    fn throughput_appears_after_the_sampling_interval() {
        let progress = TransferProgress::new();
        progress.set_total(1000);
        progress.record(100);
        assert!(!progress.snapshot().user_info.contains_key(THROUGHPUT_KEY));

        thread::sleep(THROUGHPUT_INTERVAL + Duration::from_millis(20));
        progress.record(600);

        let info = progress.snapshot().user_info;
        let throughput = info.get(THROUGHPUT_KEY).copied().unwrap();
        assert!(throughput > 0.0);
    }

    #[test]
    fn fraction_tracks_completion() {
        let progress = TransferProgress::new();
        assert_eq!(progress.fraction(), 0.0);
        progress.set_total(200);
        progress.record(50);
        assert_eq!(progress.fraction(), 0.25);
    }
}
