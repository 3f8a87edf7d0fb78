//! Dispatch loop
//!
//! Walks the command queue front to back. Each command is admitted on the
//! first device with a free slot; when every device is full the loop waits
//! for a release (bounded by the poll interval) and retries the same command,
//! so commands always start in queue order.

use futures::future::join_all;
use gpusched_core::{CommandQueue, Job, SchedResult};
use gpusched_runtime::{JobHandle, Launcher};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::allocator::Allocator;

/// Result of a dispatch run
#[derive(Debug)]
pub struct Dispatched {
    /// Handles of every job that was launched, in queue order
    pub handles: Vec<JobHandle>,
    /// How many times the loop had to wait for a free slot
    pub wait_cycles: u64,
}

impl Dispatched {
    /// Wait for every launched job to exit
    pub async fn join(self) -> Vec<SchedResult<Job>> {
        join_all(self.handles.into_iter().map(JobHandle::wait)).await
    }
}

/// Admits queued commands onto devices and launches them
pub struct Dispatcher {
    allocator: Allocator,
    launcher: Arc<dyn Launcher>,
    poll_interval: Duration,
}

impl Dispatcher {
    /// Create a dispatcher
    pub fn new(allocator: Allocator, launcher: Arc<dyn Launcher>, poll_interval: Duration) -> Self {
        Self {
            allocator,
            launcher,
            poll_interval,
        }
    }

    /// Launch every command in `queue`
    ///
    /// Returns once the last command has been launched, not when jobs finish.
    /// A command that fails to launch is logged and skipped; it is never
    /// retried.
    pub async fn run(&self, queue: &CommandQueue) -> Dispatched {
        info!(
            commands = queue.len(),
            devices = self.allocator.slots().devices().len(),
            launcher = self.launcher.name(),
            "Dispatching commands"
        );

        let mut handles = Vec::with_capacity(queue.len());
        let mut wait_cycles = 0;
        let mut index = 0;

        while let Some(command) = queue.get(index) {
            let Some(device) = self.allocator.find_available_device() else {
                wait_cycles += 1;
                debug!(
                    index,
                    poll_interval = ?self.poll_interval,
                    "Waiting for a free slot"
                );
                self.allocator
                    .slots()
                    .wait_for_release(self.poll_interval)
                    .await;
                continue;
            };

            info!(device = %device, index, command, "GPU is available, launching command");

            match self.launcher.launch(command, device).await {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    warn!(index, command, error = %e, "Skipping command that failed to launch");
                }
            }
            index += 1;
        }

        info!(launched = handles.len(), wait_cycles, "All commands dispatched");

        Dispatched {
            handles,
            wait_cycles,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use gpusched_core::{DeviceId, JobStatus, SchedError, SlotTable};
    use std::sync::Mutex;
    use tokio::sync::oneshot;

    /// Launcher whose jobs hold their slot until the test completes them
    struct HeldLauncher {
        slots: Arc<SlotTable>,
        launched: Mutex<Vec<(String, DeviceId)>>,
        gates: Mutex<Vec<Option<oneshot::Sender<()>>>>,
        fail_on: Option<String>,
    }

    impl HeldLauncher {
        fn new(slots: Arc<SlotTable>) -> Self {
            Self {
                slots,
                launched: Mutex::new(Vec::new()),
                gates: Mutex::new(Vec::new()),
                fail_on: None,
            }
        }

        fn launched(&self) -> Vec<(String, String)> {
            self.launched
                .lock()
                .unwrap()
                .iter()
                .map(|(c, d)| (c.clone(), d.to_string()))
                .collect()
        }

        fn complete(&self, n: usize) {
            let gate = self.gates.lock().unwrap()[n].take().unwrap();
            gate.send(()).unwrap();
        }

        fn complete_all(&self) {
            for gate in self.gates.lock().unwrap().iter_mut() {
                if let Some(gate) = gate.take() {
                    let _ = gate.send(());
                }
            }
        }
    }

    #[async_trait]
    impl Launcher for HeldLauncher {
        async fn launch(&self, command: &str, device: DeviceId) -> SchedResult<JobHandle> {
            if self.fail_on.as_deref() == Some(command) {
                self.slots.release(&device)?;
                return Err(SchedError::Launch(format!("cannot start {}", command)));
            }

            self.launched
                .lock()
                .unwrap()
                .push((command.to_string(), device.clone()));
            let (tx, rx) = oneshot::channel();
            self.gates.lock().unwrap().push(Some(tx));

            let job = Job::new(command, device);
            let slots = Arc::clone(&self.slots);
            let mut finished = job.clone();
            let completion = tokio::spawn(async move {
                let _ = rx.await;
                slots.release(&finished.device).unwrap();
                finished.complete();
                finished
            });
            Ok(JobHandle::new(job, completion))
        }

        fn name(&self) -> &'static str {
            "held"
        }
    }

    fn setup(ids: &[&str], capacity: usize, poll: Duration) -> (Dispatcher, Arc<HeldLauncher>) {
        let devices = ids.iter().map(|id| DeviceId::new(*id)).collect();
        let slots = Arc::new(SlotTable::new(devices, capacity).unwrap());
        let launcher = Arc::new(HeldLauncher::new(Arc::clone(&slots)));
        let dispatcher = Dispatcher::new(
            Allocator::new(slots),
            Arc::clone(&launcher) as Arc<dyn Launcher>,
            poll,
        );
        (dispatcher, launcher)
    }

    async fn wait_for_launches(launcher: &HeldLauncher, count: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while launcher.launched().len() < count {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("launches did not happen in time");
    }

    fn owned(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(c, d)| (c.to_string(), d.to_string()))
            .collect()
    }

    #[tokio::test]
    async fn test_within_capacity_never_waits() {
        let (dispatcher, launcher) = setup(&["0", "1"], 2, Duration::from_secs(60));
        let queue = CommandQueue::from_lines(["a", "b", "c", "d"]);

        let dispatched = dispatcher.run(&queue).await;

        assert_eq!(dispatched.wait_cycles, 0);
        assert_eq!(dispatched.handles.len(), 4);
        assert_eq!(
            launcher.launched(),
            owned(&[("a", "0"), ("b", "0"), ("c", "1"), ("d", "1")])
        );
        launcher.complete_all();
    }

    #[tokio::test]
    async fn test_single_device_two_slots() {
        let (dispatcher, launcher) = setup(&["0"], 2, Duration::from_secs(60));
        let queue = CommandQueue::from_lines(["echo a", "echo b"]);

        let dispatched = dispatcher.run(&queue).await;

        assert_eq!(dispatched.wait_cycles, 0);
        assert_eq!(
            launcher.launched(),
            owned(&[("echo a", "0"), ("echo b", "0")])
        );
        for handle in &dispatched.handles {
            assert_eq!(handle.job().device.as_str(), "0");
        }
        launcher.complete_all();
    }

    #[tokio::test]
    async fn test_blocks_until_a_slot_is_released() {
        let (dispatcher, launcher) = setup(&["0", "1"], 1, Duration::from_secs(60));
        let queue = CommandQueue::from_lines(["sleep 1", "sleep 1", "echo done"]);

        let run = tokio::spawn(async move { dispatcher.run(&queue).await });

        wait_for_launches(&launcher, 2).await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(launcher.launched().len(), 2);
        assert!(!run.is_finished());

        launcher.complete(1);
        let dispatched = tokio::time::timeout(Duration::from_secs(5), run)
            .await
            .expect("dispatch did not resume after release")
            .unwrap();

        assert!(dispatched.wait_cycles >= 1);
        assert_eq!(
            launcher.launched(),
            owned(&[("sleep 1", "0"), ("sleep 1", "1"), ("echo done", "1")])
        );
        launcher.complete_all();
    }

    #[tokio::test]
    async fn test_poll_interval_retries_without_release() {
        let (dispatcher, launcher) = setup(&["0"], 1, Duration::from_millis(10));
        let slots = Arc::clone(dispatcher.allocator.slots());
        let queue = CommandQueue::from_lines(["first", "second"]);

        let run = tokio::spawn(async move { dispatcher.run(&queue).await });
        wait_for_launches(&launcher, 1).await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(launcher.launched().len(), 1);
        assert_eq!(slots.total_load(), 1);

        launcher.complete(0);
        let dispatched = tokio::time::timeout(Duration::from_secs(5), run)
            .await
            .unwrap()
            .unwrap();

        assert!(dispatched.wait_cycles >= 2);
        assert_eq!(dispatched.handles.len(), 2);
        launcher.complete_all();
    }

    #[tokio::test]
    async fn test_preserves_queue_order_under_contention() {
        let (dispatcher, launcher) = setup(&["0"], 1, Duration::from_secs(60));
        let queue = CommandQueue::from_lines(["a", "b", "c", "d"]);

        let completer = {
            let launcher = Arc::clone(&launcher);
            tokio::spawn(async move {
                for i in 0..4 {
                    wait_for_launches(&launcher, i + 1).await;
                    launcher.complete(i);
                }
            })
        };

        let dispatched = dispatcher.run(&queue).await;
        completer.await.unwrap();

        let commands: Vec<String> = launcher.launched().into_iter().map(|(c, _)| c).collect();
        assert_eq!(commands, vec!["a", "b", "c", "d"]);
        assert!(dispatched.wait_cycles >= 1);

        for result in dispatched.join().await {
            assert_eq!(result.unwrap().status, JobStatus::Completed);
        }
    }

    #[tokio::test]
    async fn test_launch_failure_releases_and_continues() {
        let devices = vec![DeviceId::new("0")];
        let slots = Arc::new(SlotTable::new(devices, 1).unwrap());
        let mut launcher = HeldLauncher::new(Arc::clone(&slots));
        launcher.fail_on = Some("broken".to_string());
        let launcher = Arc::new(launcher);
        let dispatcher = Dispatcher::new(
            Allocator::new(Arc::clone(&slots)),
            Arc::clone(&launcher) as Arc<dyn Launcher>,
            Duration::from_secs(60),
        );
        let queue = CommandQueue::from_lines(["broken", "works"]);

        let dispatched = dispatcher.run(&queue).await;

        assert_eq!(dispatched.wait_cycles, 0);
        assert_eq!(dispatched.handles.len(), 1);
        assert_eq!(launcher.launched(), owned(&[("works", "0")]));
        assert_eq!(slots.total_load(), 1);
        launcher.complete_all();
    }

    #[tokio::test]
    async fn test_join_releases_every_slot() {
        let (dispatcher, launcher) = setup(&["0", "1"], 1, Duration::from_secs(60));
        let slots = Arc::clone(dispatcher.allocator.slots());
        let queue = CommandQueue::from_lines(["x", "y"]);

        let dispatched = dispatcher.run(&queue).await;
        assert_eq!(slots.total_load(), 2);

        launcher.complete_all();
        let results = dispatched.join().await;
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.is_ok()));
        assert_eq!(slots.total_load(), 0);
    }

    #[tokio::test]
    async fn test_empty_queue() {
        let (dispatcher, launcher) = setup(&["0"], 1, Duration::from_secs(60));

        let dispatched = dispatcher.run(&CommandQueue::default()).await;

        assert!(dispatched.handles.is_empty());
        assert_eq!(dispatched.wait_cycles, 0);
        assert!(launcher.launched().is_empty());
    }
}
