//! Worker-pool event loop, grounded in `virtual_oss_sequencer.c`'s
//! `cuse_worker_proc` + `main()`'s pthread spawn loop, and in the teacher's
//! `thread::spawn` / `handles.push()` / `.join()` idiom for its own worker
//! threads in `run_service_loop`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Runs `process_once` on `threads` worker threads until `running` is
/// cleared, then joins them all. Each worker's `process_once` plays the role
/// of one `cuse_wait_and_process()` iteration: it should block briefly and
/// return, not spin, so the shutdown flag is observed promptly.
pub struct WorkerPool {
    running: Arc<AtomicBool>,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    pub fn spawn<F>(threads: usize, running: Arc<AtomicBool>, process_once: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        let process_once = Arc::new(process_once);
        let mut handles = Vec::with_capacity(threads);
        for id in 0..threads.max(1) {
            let running = Arc::clone(&running);
            let process_once = Arc::clone(&process_once);
            handles.push(
                thread::Builder::new()
                    .name(format!("vm-worker-{id}"))
                    .spawn(move || {
                        while running.load(Ordering::SeqCst) {
                            process_once();
                        }
                    })
                    .expect("failed to spawn worker thread"),
            );
        }
        Self { running, handles }
    }

    pub fn stop_and_join(self) {
        self.running.store(false, Ordering::SeqCst);
        for handle in self.handles {
            let _ = handle.join();
        }
    }
}

/// Default worker count, mirroring `main()`'s `2 * sysconf(_SC_NPROCESSORS_ONLN)`
/// fallback when the caller did not request an explicit thread count.
pub fn default_worker_count() -> usize {
    thread::available_parallelism()
        .map(|n| n.get() * 2)
        .unwrap_or(32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    #[test]
    fn pool_stops_when_flag_cleared() {
        let running = Arc::new(AtomicBool::new(true));
        let counter = Arc::new(AtomicUsize::new(0));
        let counter_clone = Arc::clone(&counter);
        let pool = WorkerPool::spawn(2, Arc::clone(&running), move || {
            counter_clone.fetch_add(1, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(1));
        });
        thread::sleep(Duration::from_millis(20));
        pool.stop_and_join();
        assert!(counter.load(Ordering::SeqCst) > 0);
    }
}
