use crate::dispatcher::Dispatcher;
use crate::sink::ActuatorSink;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Recurring liveness check. Runs on its own thread and goes through the
/// dispatcher's `stop_if_expired`, so the stop shares the same mutual
/// exclusion as normal command dispatch. The check interval must be shorter
/// than the timeout so a dead client is caught promptly, not only at the
/// exact timeout instant.
pub struct Watchdog {
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Watchdog {
    pub fn spawn<S>(dispatcher: Arc<Dispatcher<S>>, timeout: Duration, interval: Duration) -> Self
    where
        S: ActuatorSink + Send + 'static,
    {
        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);
        let handle = thread::spawn(move || {
            log::info!(
                "watchdog running: timeout {:?}, check every {:?}",
                timeout,
                interval
            );
            while flag.load(Ordering::Relaxed) {
                thread::sleep(interval);
                if !flag.load(Ordering::Relaxed) {
                    break;
                }
                if dispatcher.stop_if_expired(timeout) {
                    log::warn!("no command for {:?}, forced stop", timeout);
                }
            }
        });
        Watchdog {
            running,
            handle: Some(handle),
        }
    }

    /// Stop the check loop and join the thread. Must be called before the
    /// actuator sink is torn down; also runs on drop.
    pub fn cancel(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Watchdog {
    fn drop(&mut self) {
        self.cancel();
    }
}
