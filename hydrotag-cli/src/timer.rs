use std::collections::HashMap;
use std::time::Duration;

use hydrotag_core::{Scheduler, TimerHandle};
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

/// Repeating timers backed by tokio intervals. Each tick is sent on the
/// channel with the handle of the timer that fired.
pub struct TokioScheduler {
    tx: UnboundedSender<TimerHandle>,
    tasks: HashMap<TimerHandle, JoinHandle<()>>,
    next_id: u64,
}

impl TokioScheduler {
    pub fn new(tx: UnboundedSender<TimerHandle>) -> Self {
        Self { tx, tasks: HashMap::new(), next_id: 0 }
    }
}

impl Scheduler for TokioScheduler {
    fn schedule_repeating(&mut self, period: Duration) -> Result<TimerHandle, String> {
        self.next_id += 1;
        let handle = TimerHandle(self.next_id);
        let tx = self.tx.clone();
        let task = tokio::spawn(async move {
            let start = tokio::time::Instant::now() + period;
            let mut interval = tokio::time::interval_at(start, period);
            loop {
                interval.tick().await;
                if tx.send(handle).is_err() {
                    break;
                }
            }
        });
        self.tasks.insert(handle, task);
        Ok(handle)
    }

    fn cancel(&mut self, handle: TimerHandle) {
        if let Some(task) = self.tasks.remove(&handle) {
            task.abort();
        }
    }
}

impl Drop for TokioScheduler {
    fn drop(&mut self) {
        for (_, task) in self.tasks.drain() {
            task.abort();
        }
    }
}
