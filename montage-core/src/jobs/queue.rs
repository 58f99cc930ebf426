//! Priority job queue with a single lazily-started worker thread
//!
//! Heavy batch work (render, export, transcode, voice) is serialized through
//! one worker so at most one job runs at a time. Completions are never
//! reported from the worker: they are posted onto the owning thread, where
//! listeners may freely touch UI-owned state.

use super::types::{Job, JobCategory, JobListener, JobQueueState, JobResult, JobWork};
use crate::errors::{panic_message, CoordError};
use crate::owner::OwnerHandle;
use chrono::Utc;
use parking_lot::{Condvar, Mutex, RwLock};
use std::collections::BinaryHeap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::JoinHandle;

struct QueueState {
    heap: BinaryHeap<Job>,
    next_seq: u64,
    phase: JobQueueState,
    shutdown_requested: bool,
}

struct Shared {
    state: Mutex<QueueState>,
    available: Condvar,
    listeners: RwLock<Vec<Arc<dyn JobListener>>>,
}

pub struct JobQueue {
    shared: Arc<Shared>,
    /// Guards the "is a worker alive" check so concurrent submits spawn at most one
    worker: Mutex<Option<JoinHandle<()>>>,
    owner: OwnerHandle,
    default_priority: i32,
}

impl JobQueue {
    pub fn new(owner: OwnerHandle, default_priority: i32) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(QueueState {
                    heap: BinaryHeap::new(),
                    next_seq: 0,
                    phase: JobQueueState::Idle,
                    shutdown_requested: false,
                }),
                available: Condvar::new(),
                listeners: RwLock::new(Vec::new()),
            }),
            worker: Mutex::new(None),
            owner,
            default_priority,
        }
    }

    /// Register a completion listener. Listeners run on the owning thread.
    pub fn add_listener(&self, listener: Arc<dyn JobListener>) {
        self.shared.listeners.write().push(listener);
    }

    /// Submit with the queue's default priority.
    pub fn submit<F>(&self, category: JobCategory, id: impl Into<String>, work: F)
    where
        F: FnOnce() -> Result<serde_json::Value, String> + Send + 'static,
    {
        self.submit_with_priority(category, id, work, self.default_priority);
    }

    /// Enqueue a job. Safe to call from any thread; starts the worker if none is alive.
    pub fn submit_with_priority<F>(
        &self,
        category: JobCategory,
        id: impl Into<String>,
        work: F,
        priority: i32,
    ) where
        F: FnOnce() -> Result<serde_json::Value, String> + Send + 'static,
    {
        let id = id.into();
        {
            let mut state = self.shared.state.lock();
            let seq = state.next_seq;
            state.next_seq += 1;
            log::debug!(
                "[JOB_QUEUE] Queued {} job '{}' (priority {}, seq {})",
                category,
                id,
                priority,
                seq
            );
            state.heap.push(Job {
                priority,
                seq,
                id,
                category,
                work: Box::new(work) as JobWork,
            });
        }
        self.shared.available.notify_one();
        self.ensure_worker();
    }

    /// Ask the worker to exit once its current job completes. Queued jobs that
    /// have not started are kept, and run once a later submit finds the queue
    /// idle and starts a fresh worker.
    pub fn shutdown(&self) {
        let mut state = self.shared.state.lock();
        state.shutdown_requested = true;
        if state.phase == JobQueueState::Running {
            state.phase = JobQueueState::Draining;
        }
        drop(state);
        self.shared.available.notify_all();
        log::info!("[JOB_QUEUE] Shutdown requested");
    }

    /// Shut down and block until the worker thread has exited.
    pub fn join(&self) {
        self.shutdown();
        let handle = self.worker.lock().take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                log::error!("[JOB_QUEUE] Worker thread panicked");
            }
        }
    }

    pub fn state(&self) -> JobQueueState {
        self.shared.state.lock().phase
    }

    /// Number of jobs waiting to start
    pub fn pending(&self) -> usize {
        self.shared.state.lock().heap.len()
    }

    fn ensure_worker(&self) {
        let mut worker = self.worker.lock();
        {
            // The worker flips the phase to Idle under this lock right before it
            // exits. Running means it will still see the new job; Draining means
            // the job waits for the next start.
            let mut state = self.shared.state.lock();
            match state.phase {
                JobQueueState::Running => return,
                JobQueueState::Draining => {
                    log::debug!(
                        "[JOB_QUEUE] Worker is draining, {} job(s) wait for a restart",
                        state.heap.len()
                    );
                    return;
                }
                JobQueueState::Idle => {}
            }
            // The previous worker has exited, so its shutdown request is spent
            state.shutdown_requested = false;
            state.phase = JobQueueState::Running;
        }
        // Reap a worker that already exited before replacing it
        if let Some(old) = worker.take() {
            let _ = old.join();
        }

        let shared = self.shared.clone();
        let owner = self.owner.clone();
        let spawned = std::thread::Builder::new()
            .name("job-queue-worker".to_string())
            .spawn(move || worker_loop(shared, owner));

        match spawned {
            Ok(handle) => {
                log::info!("[JOB_QUEUE] Worker started");
                *worker = Some(handle);
            }
            Err(e) => {
                log::error!("[JOB_QUEUE] Failed to spawn worker: {}", e);
                self.shared.state.lock().phase = JobQueueState::Idle;
            }
        }
    }
}

impl Drop for JobQueue {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_loop(shared: Arc<Shared>, owner: OwnerHandle) {
    loop {
        let job = {
            let mut state = shared.state.lock();
            loop {
                if state.shutdown_requested {
                    state.phase = JobQueueState::Idle;
                    log::info!("[JOB_QUEUE] Worker stopped");
                    return;
                }
                if let Some(job) = state.heap.pop() {
                    break job;
                }
                shared.available.wait(&mut state);
            }
        };

        let Job {
            id, category, work, ..
        } = job;
        log::info!("[JOB_QUEUE] Running {} job '{}'", category, id);

        let outcome = match catch_unwind(AssertUnwindSafe(work)) {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(message)) => Err(CoordError::TransientJob {
                id: id.clone(),
                message,
            }),
            Err(payload) => Err(CoordError::TransientJob {
                id: id.clone(),
                message: panic_message(payload.as_ref()),
            }),
        };

        if let Err(ref e) = outcome {
            log::warn!("[JOB_QUEUE] {}", e);
        }

        deliver(
            &shared,
            &owner,
            JobResult {
                id,
                category,
                outcome,
                finished_at: Utc::now(),
            },
        );
    }
}

/// Post the result onto the owning thread; listeners never run on the worker.
fn deliver(shared: &Arc<Shared>, owner: &OwnerHandle, result: JobResult) {
    let shared = shared.clone();
    owner.post(move || {
        let listeners = shared.listeners.read().clone();
        for listener in listeners {
            let delivered = catch_unwind(AssertUnwindSafe(|| {
                listener.on_task_finished(&result.id, result.value(), result.error())
            }));
            if let Err(payload) = delivered {
                log::error!(
                    "[JOB_QUEUE] Listener for '{}' {}",
                    result.id,
                    panic_message(payload.as_ref())
                );
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::owner::OwnerLoop;
    use serde_json::{json, Value};
    use std::sync::mpsc;

    type Finished = Arc<Mutex<Vec<(String, bool, bool)>>>;

    /// Records (id, succeeded, delivered-on-owner) and stops the loop after `expected` results.
    fn recording_listener(owner: OwnerHandle, expected: usize) -> (Arc<dyn JobListener>, Finished) {
        let finished: Finished = Arc::new(Mutex::new(Vec::new()));
        let sink = finished.clone();
        let listener = move |id: &str, result: Option<&Value>, _error: Option<&CoordError>| {
            let mut seen = sink.lock();
            seen.push((id.to_string(), result.is_some(), owner.is_owner_thread()));
            if seen.len() == expected {
                owner.stop();
            }
        };
        (Arc::new(listener), finished)
    }

    #[test]
    fn test_priority_then_submission_order() {
        let owner = OwnerLoop::new();
        let handle = owner.handle();
        let queue = JobQueue::new(handle.clone(), 10);
        let (listener, finished) = recording_listener(handle.clone(), 4);
        queue.add_listener(listener);

        // Hold the worker on a gate job so the next three are all queued before any runs
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let (started_tx, started_rx) = mpsc::channel::<()>();
        queue.submit_with_priority(
            JobCategory::Other("gate".to_string()),
            "gate",
            move || {
                started_tx.send(()).map_err(|e| e.to_string())?;
                release_rx.recv().map_err(|e| e.to_string())?;
                Ok(Value::Null)
            },
            -1,
        );
        started_rx.recv().unwrap();

        let order = Arc::new(Mutex::new(Vec::new()));
        for (id, priority) in [("export", 0), ("manim", 1), ("export2", 0)] {
            let order = order.clone();
            queue.submit_with_priority(
                JobCategory::Export,
                id,
                move || {
                    order.lock().push(id);
                    Ok(json!(id))
                },
                priority,
            );
        }
        assert_eq!(queue.pending(), 3);
        release_tx.send(()).unwrap();

        owner.run();

        assert_eq!(*order.lock(), vec!["export", "export2", "manim"]);
        let finished = finished.lock();
        let ids: Vec<&str> = finished.iter().map(|(id, _, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["gate", "export", "export2", "manim"]);
        assert!(finished.iter().all(|(_, _, on_owner)| *on_owner));
    }

    #[test]
    fn test_failures_are_delivered_and_queue_continues() {
        let owner = OwnerLoop::new();
        let handle = owner.handle();
        let queue = JobQueue::new(handle.clone(), 10);
        let (listener, finished) = recording_listener(handle.clone(), 3);
        queue.add_listener(listener);

        queue.submit(JobCategory::Render, "fails", || Err("codec missing".to_string()));
        queue.submit(JobCategory::Render, "panics", || -> Result<Value, String> {
            panic!("render crashed")
        });
        queue.submit(JobCategory::Voice, "ok", || Ok(json!({"path": "out.wav"})));

        owner.run();

        let finished = finished.lock();
        assert_eq!(
            *finished,
            vec![
                ("fails".to_string(), false, true),
                ("panics".to_string(), false, true),
                ("ok".to_string(), true, true),
            ]
        );
    }

    #[test]
    fn test_error_reaches_listener_as_transient_job_error() {
        let owner = OwnerLoop::new();
        let handle = owner.handle();
        let queue = JobQueue::new(handle.clone(), 10);
        let errors = Arc::new(Mutex::new(Vec::new()));
        let sink = errors.clone();
        queue.add_listener(Arc::new(
            move |_id: &str, _result: Option<&Value>, error: Option<&CoordError>| {
                if let Some(e) = error {
                    sink.lock().push(e.clone());
                }
                handle.stop();
            },
        ));

        queue.submit(JobCategory::Transcode, "t1", || Err("disk full".to_string()));
        owner.run();
        queue.join();

        assert_eq!(
            *errors.lock(),
            vec![CoordError::TransientJob {
                id: "t1".to_string(),
                message: "disk full".to_string()
            }]
        );
    }

    #[test]
    fn test_lifecycle_states() {
        let owner = OwnerLoop::new();
        let queue = JobQueue::new(owner.handle(), 10);
        assert_eq!(queue.state(), JobQueueState::Idle);

        queue.submit(JobCategory::Export, "a", || Ok(Value::Null));
        assert_ne!(queue.state(), JobQueueState::Idle);

        queue.join();
        assert_eq!(queue.state(), JobQueueState::Idle);

        // Submitting again restarts the worker lazily
        queue.submit(JobCategory::Export, "b", || Ok(Value::Null));
        assert_ne!(queue.state(), JobQueueState::Idle);
        queue.join();
        assert_eq!(queue.state(), JobQueueState::Idle);
    }

    #[test]
    fn test_concurrent_submitters_share_one_worker() {
        let owner = OwnerLoop::new();
        let handle = owner.handle();
        let queue = Arc::new(JobQueue::new(handle.clone(), 10));
        let (listener, finished) = recording_listener(handle.clone(), 40);
        queue.add_listener(listener);

        let running = Arc::new(Mutex::new(0usize));
        let max_running = Arc::new(Mutex::new(0usize));

        let submitters: Vec<_> = (0..4)
            .map(|t| {
                let queue = queue.clone();
                let running = running.clone();
                let max_running = max_running.clone();
                std::thread::spawn(move || {
                    for i in 0..10 {
                        let running = running.clone();
                        let max_running = max_running.clone();
                        queue.submit(JobCategory::Render, format!("{}-{}", t, i), move || {
                            {
                                let mut now = running.lock();
                                *now += 1;
                                let mut max = max_running.lock();
                                *max = (*max).max(*now);
                            }
                            std::thread::sleep(std::time::Duration::from_millis(1));
                            *running.lock() -= 1;
                            Ok(Value::Null)
                        });
                    }
                })
            })
            .collect();
        for s in submitters {
            s.join().unwrap();
        }

        owner.run();
        assert_eq!(finished.lock().len(), 40);
        assert_eq!(*max_running.lock(), 1);
    }

    #[test]
    fn test_join_returns_when_submit_races_it() {
        let owner = OwnerLoop::new();
        let queue = Arc::new(JobQueue::new(owner.handle(), 10));

        let (started_tx, started_rx) = mpsc::channel::<()>();
        queue.submit(JobCategory::Render, "long", move || {
            started_tx.send(()).map_err(|e| e.to_string())?;
            std::thread::sleep(std::time::Duration::from_millis(300));
            Ok(Value::Null)
        });
        started_rx.recv().unwrap();

        let (joined_tx, joined_rx) = mpsc::channel::<()>();
        let joiner = {
            let queue = queue.clone();
            std::thread::spawn(move || {
                queue.join();
                let _ = joined_tx.send(());
            })
        };
        std::thread::sleep(std::time::Duration::from_millis(50));

        let (ran_tx, ran_rx) = mpsc::channel::<&'static str>();
        let late_tx = ran_tx.clone();
        let submitter = {
            let queue = queue.clone();
            std::thread::spawn(move || {
                queue.submit(JobCategory::Export, "late", move || {
                    late_tx.send("late").map_err(|e| e.to_string())?;
                    Ok(Value::Null)
                });
            })
        };

        assert!(joined_rx
            .recv_timeout(std::time::Duration::from_secs(3))
            .is_ok());
        joiner.join().unwrap();
        submitter.join().unwrap();
        assert_eq!(queue.state(), JobQueueState::Idle);
        assert_eq!(queue.pending(), 1);

        // The next submit starts a fresh worker that also runs the held job
        queue.submit(JobCategory::Export, "after", move || {
            ran_tx.send("after").map_err(|e| e.to_string())?;
            Ok(Value::Null)
        });
        let timeout = std::time::Duration::from_secs(3);
        let mut ran = vec![
            ran_rx.recv_timeout(timeout).unwrap(),
            ran_rx.recv_timeout(timeout).unwrap(),
        ];
        ran.sort();
        assert_eq!(ran, vec!["after", "late"]);
        queue.join();
        assert_eq!(queue.state(), JobQueueState::Idle);
    }
}
