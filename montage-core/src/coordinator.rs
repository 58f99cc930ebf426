//! The coordination context
//!
//! Built once by the host around its owning-thread handle and document sink,
//! then passed to whatever needs the job queue, the mutation router or the
//! agent layer. Tests build their own isolated instances.

use crate::ai::multi_agent::{AgentRouter, ParallelInvoker, Specialist, SpecialistRegistry};
use crate::ai::LanguageModel;
use crate::config::Config;
use crate::document::{AgentContext, DocumentSink, MutationQueue, MutationRouter};
use crate::jobs::JobQueue;
use crate::owner::OwnerHandle;
use crate::tools::create_document_registry;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub struct Coordinator {
    config: Config,
    owner: OwnerHandle,
    jobs: JobQueue,
    mutations: MutationQueue,
    router: Arc<MutationRouter>,
    agent_context: AgentContext,
    specialists: Arc<SpecialistRegistry>,
    started: AtomicBool,
}

impl Coordinator {
    pub fn new(config: Config, owner: OwnerHandle, sink: Arc<dyn DocumentSink>) -> Self {
        let agent_context = AgentContext::new();
        let mutations = MutationQueue::new(sink.clone(), owner.clone());
        let router = Arc::new(MutationRouter::new(
            sink,
            mutations.clone(),
            agent_context.clone(),
        ));
        Self {
            jobs: JobQueue::new(owner.clone(), config.default_job_priority),
            config,
            owner,
            mutations,
            router,
            agent_context,
            specialists: Arc::new(SpecialistRegistry::new()),
            started: AtomicBool::new(false),
        }
    }

    /// Mark the context live. Workers are still started lazily on first use.
    pub fn start(&self) {
        if self.started.swap(true, Ordering::SeqCst) {
            return;
        }
        log::info!(
            "[COORDINATOR] Started (pool {}, specialist timeout {}s, job priority {})",
            self.config.pool_size,
            self.config.specialist_timeout_secs,
            self.config.default_job_priority
        );
    }

    /// Stop the job worker after its current job and clear any agent mode.
    /// Queued document edits keep draining on the owning loop.
    pub fn shutdown(&self) {
        if !self.started.swap(false, Ordering::SeqCst) {
            return;
        }
        self.jobs.join();
        self.agent_context.set(false);
        log::info!(
            "[COORDINATOR] Shut down ({} edit(s) still queued, {} applied, {} dropped)",
            self.mutations.pending(),
            self.mutations.applied_count(),
            self.mutations.dropped_count()
        );
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn owner(&self) -> &OwnerHandle {
        &self.owner
    }

    pub fn jobs(&self) -> &JobQueue {
        &self.jobs
    }

    pub fn mutations(&self) -> &MutationQueue {
        &self.mutations
    }

    /// The document surface both the UI and agents should write through
    pub fn router(&self) -> &Arc<MutationRouter> {
        &self.router
    }

    pub fn agent_context(&self) -> &AgentContext {
        &self.agent_context
    }

    pub fn specialists(&self) -> &Arc<SpecialistRegistry> {
        &self.specialists
    }

    /// A specialist wired to the document tools and this context's agent flag
    pub fn document_specialist(
        &self,
        name: &str,
        domain: &str,
        model: Arc<dyn LanguageModel>,
    ) -> Specialist {
        Specialist::new(name, domain, model, self.agent_context.clone())
            .with_tools(create_document_registry(self.router.clone()))
            .with_max_iterations(self.config.specialist_max_iterations)
    }

    /// Supervisor over the registered specialists, sized from config
    pub fn agent_router(&self, model: Arc<dyn LanguageModel>) -> AgentRouter {
        let invoker = ParallelInvoker::from_config(self.specialists.clone(), &self.config);
        AgentRouter::new(model, invoker, Arc::new(self.owner.clone())).with_config(&self.config)
    }
}

impl Drop for Coordinator {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::{AiResponse, Message, ScriptedModel, ToolCall};
    use crate::document::InMemoryDocument;
    use crate::errors::CoordError;
    use crate::jobs::JobCategory;
    use crate::owner::OwnerLoop;
    use parking_lot::Mutex;
    use serde_json::{json, Value};

    #[test]
    fn test_job_completion_reaches_owner_thread() {
        let owner = OwnerLoop::new();
        let handle = owner.handle();
        let doc = Arc::new(InMemoryDocument::new());
        let coordinator = Coordinator::new(Config::default(), handle.clone(), doc);
        coordinator.start();

        let finished = Arc::new(Mutex::new(Vec::new()));
        let seen = finished.clone();
        let stopper = handle.clone();
        coordinator.jobs().add_listener(Arc::new(
            move |id: &str, result: Option<&Value>, _error: Option<&CoordError>| {
                seen.lock().push((id.to_string(), result.cloned(), stopper.is_owner_thread()));
                stopper.stop();
            },
        ));
        coordinator
            .jobs()
            .submit(JobCategory::Export, "export", || Ok(json!({"path": "out.mp4"})));

        owner.run();
        coordinator.shutdown();
        assert!(!coordinator.is_started());

        let finished = finished.lock();
        assert_eq!(finished.len(), 1);
        assert_eq!(finished[0].0, "export");
        assert_eq!(finished[0].1, Some(json!({"path": "out.mp4"})));
        assert!(finished[0].2);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_agent_turn_edits_document() {
        let owner = OwnerLoop::new();
        let handle = owner.handle();
        let owner_thread = std::thread::spawn(move || owner.run());

        let doc = Arc::new(InMemoryDocument::new());
        let coordinator = Coordinator::new(Config::default(), handle.clone(), doc.clone());
        coordinator.start();

        let specialist_model = Arc::new(
            ScriptedModel::new()
                .respond(
                    "specialist-default",
                    AiResponse::with_tools(vec![ToolCall::new(
                        "t1",
                        "insert_entry",
                        json!({"key": "title", "values": {"text": "Intro"}}),
                    )]),
                )
                .respond("specialist-default", AiResponse::text("title added")),
        );
        coordinator.specialists().register(Arc::new(coordinator.document_specialist(
            "titles",
            "title cards",
            specialist_model,
        )));

        let supervisor_model = Arc::new(
            ScriptedModel::new()
                .respond(
                    "supervisor-default",
                    AiResponse::with_tools(vec![ToolCall::new(
                        "s1",
                        "invoke_titles",
                        json!({"task": "add an Intro title"}),
                    )]),
                )
                .respond("supervisor-default", AiResponse::text("Done.")),
        );
        let outcome = coordinator
            .agent_router(supervisor_model)
            .handle_turn(vec![Message::user("add an intro title")])
            .await;
        assert_eq!(outcome.response, "Done.");

        while !coordinator.mutations().is_idle() {
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        assert_eq!(doc.get("title"), Some(json!({"text": "Intro"})));

        coordinator.shutdown();
        handle.stop();
        owner_thread.join().unwrap();
    }
}
