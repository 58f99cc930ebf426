use dotenv::dotenv;
use montage_core::ai::multi_agent::SubAgent;
use montage_core::ai::{AiResponse, LanguageModel, Message, ScriptedModel, ToolCall};
use montage_core::document::InMemoryDocument;
use montage_core::jobs::JobCategory;
use montage_core::owner::OwnerLoop;
use montage_core::{Config, CoordError, Coordinator};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

type Model = Arc<dyn LanguageModel>;

fn invoke(id: &str, specialist: &str, task: &str) -> ToolCall {
    ToolCall::new(id, format!("invoke_{}", specialist), json!({ "task": task }))
}

/// Scripted replies for the demo turn: the supervisor fans out to three
/// specialists, one of which is missing its backend.
fn demo_models(config: &Config) -> (Model, Model, Model) {
    let supervisor = ScriptedModel::new()
        .respond(
            &config.supervisor_model,
            AiResponse::with_tools(vec![
                invoke("s1", "timeline", "Put intro.mp4 at the start of track 1"),
                invoke("s2", "color", "Give the intro a warm grade"),
                invoke("s3", "voice", "Narrate the intro"),
            ]),
        )
        .respond(
            &config.supervisor_model,
            AiResponse::text(
                "The intro clip is on track 1 with a warm grade. Narration is unavailable here.",
            ),
        );

    let timeline = ScriptedModel::new()
        .respond(
            &config.specialist_model,
            AiResponse::with_tools(vec![ToolCall::new(
                "t1",
                "insert_entry",
                json!({
                    "key": "clip/intro",
                    "values": {"source": "intro.mp4", "track": 1, "start": 0.0}
                }),
            )]),
        )
        .respond(&config.specialist_model, AiResponse::text("Placed intro.mp4 at 0.0 on track 1."));

    let color = ScriptedModel::new()
        .respond(
            &config.specialist_model,
            AiResponse::with_tools(vec![ToolCall::new(
                "c1",
                "insert_entry",
                json!({"key": "grade/intro", "values": {"temperature": 6500, "tint": 0.1}}),
            )]),
        )
        .respond(&config.specialist_model, AiResponse::text("Applied a warm grade to the intro."));

    (Arc::new(supervisor), Arc::new(timeline), Arc::new(color))
}

fn main() {
    dotenv().ok();
    env_logger::init();

    let config = Config::from_env();
    log::info!("Starting montage-core host with {:?}", config);

    // This thread owns the document for the rest of the process
    let owner = OwnerLoop::new();
    let handle = owner.handle();
    let doc = Arc::new(InMemoryDocument::new());
    let coordinator = Arc::new(Coordinator::new(config.clone(), handle.clone(), doc.clone()));
    coordinator.start();

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("montage-agent")
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            log::error!("Failed to build async runtime: {}", e);
            std::process::exit(1);
        }
    };

    let export_done = Arc::new(Notify::new());
    let notify = export_done.clone();
    coordinator.jobs().add_listener(Arc::new(
        move |id: &str, result: Option<&Value>, error: Option<&CoordError>| {
            match (result, error) {
                (_, Some(e)) => log::error!("Job '{}' failed: {}", id, e),
                (Some(value), None) => log::info!("Job '{}' finished: {}", id, value),
                (None, None) => log::info!("Job '{}' finished", id),
            }
            notify.notify_one();
        },
    ));
    coordinator.jobs().submit(JobCategory::Export, "export-draft", || {
        std::thread::sleep(Duration::from_millis(200));
        Ok(json!({"path": "draft.mp4", "frames": 240}))
    });

    let (supervisor_model, timeline_model, color_model) = demo_models(&config);
    coordinator.specialists().register(Arc::new(coordinator.document_specialist(
        "timeline",
        "placing, trimming and moving clips on tracks",
        timeline_model,
    )));
    coordinator.specialists().register(Arc::new(coordinator.document_specialist(
        "color",
        "color grading and looks",
        color_model,
    )));
    let voice = coordinator
        .document_specialist("voice", "voice-over generation", supervisor_model.clone())
        .unavailable("no speech engine is configured");
    log::info!("Registering '{}' without its backend", voice.name());
    coordinator.specialists().register(Arc::new(voice));

    let turn = coordinator.clone();
    let stopper = handle.clone();
    runtime.spawn(async move {
        let outcome = turn
            .agent_router(supervisor_model)
            .handle_turn(vec![Message::user(
                "Put the intro clip first, make it warm, and add a narration.",
            )])
            .await;

        for result in &outcome.results {
            log::info!("[{}] {}", result.agent, result.text());
        }
        println!("{}", outcome.response);

        while !turn.mutations().is_idle() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        export_done.notified().await;
        stopper.stop();
    });

    owner.run();

    coordinator.shutdown();
    runtime.shutdown_timeout(Duration::from_secs(1));

    println!("Document: {}", doc.snapshot());
    log::info!(
        "Agent edits applied: {}, dropped: {}",
        coordinator.mutations().applied_count(),
        coordinator.mutations().dropped_count()
    );
}
