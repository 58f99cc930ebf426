//! Bounded parallel execution of specialist calls
//!
//! A shared semaphore caps how many specialists run at once across every
//! batch. Each call gets its own timeout, counted from when it wins a pool
//! slot, and failures stay confined to their own slot in the result list.

use super::registry::SpecialistRegistry;
use super::types::{SpecialistResult, SubAgent, SubAgentCall};
use crate::config::Config;
use crate::errors::CoordError;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

enum Slot {
    Ready(SpecialistResult),
    Running(String, JoinHandle<SpecialistResult>),
}

#[derive(Clone)]
pub struct ParallelInvoker {
    registry: Arc<SpecialistRegistry>,
    pool: Arc<Semaphore>,
    pool_size: usize,
    timeout: Duration,
}

impl ParallelInvoker {
    pub fn new(registry: Arc<SpecialistRegistry>, pool_size: usize, timeout: Duration) -> Self {
        let pool_size = pool_size.max(1);
        Self {
            registry,
            pool: Arc::new(Semaphore::new(pool_size)),
            pool_size,
            timeout,
        }
    }

    pub fn from_config(registry: Arc<SpecialistRegistry>, config: &Config) -> Self {
        Self::new(registry, config.pool_size, config.specialist_timeout())
    }

    pub fn registry(&self) -> &Arc<SpecialistRegistry> {
        &self.registry
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    /// Pool slots not currently held by a running specialist
    pub fn idle_slots(&self) -> usize {
        self.pool.available_permits()
    }

    /// Run one call on the current task, without a pool slot
    pub async fn invoke_one(&self, call: SubAgentCall) -> SpecialistResult {
        let name = call.agent.clone();
        match self.registry.resolve(&name) {
            Ok(agent) => run_with_timeout(agent, call, self.timeout).await,
            Err(e) => {
                log::warn!("[INVOKER] {}", e);
                SpecialistResult::from_error(name, &e)
            }
        }
    }

    /// Run every call concurrently (bounded by the pool) and return one result
    /// per call, in submission order.
    pub async fn invoke_many(&self, calls: Vec<SubAgentCall>) -> Vec<SpecialistResult> {
        log::info!(
            "[INVOKER] Dispatching {} specialist call(s), {} of {} slots idle",
            calls.len(),
            self.idle_slots(),
            self.pool_size
        );

        let mut slots = Vec::with_capacity(calls.len());
        for call in calls {
            let name = call.agent.clone();
            match self.registry.resolve(&name) {
                Ok(agent) => {
                    let pool = self.pool.clone();
                    let timeout = self.timeout;
                    let handle = tokio::spawn(async move {
                        let _permit = match pool.acquire_owned().await {
                            Ok(permit) => permit,
                            Err(_) => {
                                let reason = "invoker pool is closed";
                                return SpecialistResult::failure(call.agent, reason);
                            }
                        };
                        run_with_timeout(agent, call, timeout).await
                    });
                    slots.push(Slot::Running(name, handle));
                }
                // Unroutable calls never reach the pool
                Err(e) => {
                    log::warn!("[INVOKER] {}", e);
                    slots.push(Slot::Ready(SpecialistResult::from_error(name, &e)));
                }
            }
        }

        let mut results = Vec::with_capacity(slots.len());
        for slot in slots {
            results.push(match slot {
                Slot::Ready(result) => result,
                Slot::Running(name, handle) => match handle.await {
                    Ok(result) => result,
                    Err(e) if e.is_panic() => {
                        let detail = crate::errors::panic_message(e.into_panic().as_ref());
                        log::error!("[INVOKER] Specialist '{}' {}", name, detail);
                        SpecialistResult::failure(name, detail)
                    }
                    Err(_) => SpecialistResult::failure(name, "cancelled"),
                },
            });
        }
        results
    }
}

async fn run_with_timeout(
    agent: Arc<dyn SubAgent>,
    call: SubAgentCall,
    timeout: Duration,
) -> SpecialistResult {
    let name = call.agent.clone();
    let start = std::time::Instant::now();

    let result = match tokio::time::timeout(timeout, agent.run(call)).await {
        Ok(Ok(output)) => SpecialistResult::success(name.clone(), output),
        Ok(Err(e)) => {
            if e.is_recoverable() {
                log::warn!("[INVOKER] Specialist '{}' failed: {}", name, e);
            } else {
                log::error!("[INVOKER] Specialist '{}' failed: {}", name, e);
            }
            SpecialistResult::failure(name.clone(), e)
        }
        Err(_) => SpecialistResult::failure(
            name.clone(),
            CoordError::SpecialistTimeout(name.clone(), timeout),
        ),
    };

    log::info!(
        "[INVOKER] Specialist '{}' finished in {}ms, success: {}",
        name,
        start.elapsed().as_millis(),
        result.is_success()
    );
    result
}
