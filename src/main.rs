//! Application entry point — voice-morph console front-end.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Load [`AppConfig`] from disk (returns default on first run).
//! 3. Create [`tokio`] runtime (multi-thread, 2 workers).
//! 4. Build the capture backend and the remote transformation client.
//! 5. Construct the [`WorkflowOrchestrator`] and subscribe to its events.
//! 6. Read commands from stdin until `quit` / EOF.
//!
//! The console is a stand-in presentation layer: it renders workflow events
//! as log lines and maps one-line commands onto orchestrator operations.

use std::path::Path;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};

use voice_morph::capture::MicrophoneBackend;
use voice_morph::config::AppConfig;
use voice_morph::job::HttpTransformService;
use voice_morph::params::ParamField;
use voice_morph::source::AudioArtifact;
use voice_morph::workflow::WorkflowOrchestrator;
use voice_morph::WorkflowEvent;

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

fn main() -> anyhow::Result<()> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("voice-morph starting up");

    // 2. Configuration
    let config = AppConfig::load().unwrap_or_else(|e| {
        log::warn!("Failed to load config ({e}); using defaults");
        AppConfig::default()
    });

    // 3. Tokio runtime (capture accumulation + exchange each take a worker)
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()?;

    rt.block_on(run(config))
}

async fn run(config: AppConfig) -> anyhow::Result<()> {
    // 4. Collaborators
    let backend = Arc::new(MicrophoneBackend::new());
    let service = Arc::new(HttpTransformService::from_config(&config.remote));

    // 5. Orchestrator + event renderer
    let mut orchestrator = WorkflowOrchestrator::from_config(&config, backend, service);
    let mut events = orchestrator.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => render_event(&event),
                Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                    log::warn!("ui: dropped {n} events");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    println!("voice-morph — type `help` for commands");

    // 6. Command loop
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let mut words = line.split_whitespace();
        let Some(command) = words.next() else {
            continue;
        };
        let args: Vec<&str> = words.collect();

        let result = match (command, args.as_slice()) {
            ("help", _) => {
                print_help();
                Ok(())
            }
            ("state", _) => {
                println!(
                    "{} (source: {}, processed: {})",
                    orchestrator.state().label(),
                    orchestrator
                        .current_source()
                        .map(|c| format!("{} bytes", c.len()))
                        .unwrap_or_else(|| "none".into()),
                    if orchestrator.processed().is_some() {
                        "yes"
                    } else {
                        "no"
                    }
                );
                Ok(())
            }
            ("params", _) => {
                let p = orchestrator.parameters();
                println!(
                    "shift={:.1} formant={:.1} base={}",
                    p.pitch_shift, p.formant_shift, p.base_frequency
                );
                Ok(())
            }
            ("record", _) => orchestrator.start_capture().await,
            ("stop", _) => orchestrator.stop_capture().await,
            ("load", [path]) => match load_clip(path).await {
                Ok(clip) => orchestrator.adopt_file(clip),
                Err(e) => {
                    log::error!("could not read {path}: {e}");
                    Ok(())
                }
            },
            ("set", [field, value]) => match (field.parse::<ParamField>(), value.parse::<f64>()) {
                (Ok(field), Ok(value)) => orchestrator.set_parameter(field, value),
                (Err(e), _) => Err(e.into()),
                (_, Err(e)) => {
                    log::error!("not a number: {e}");
                    Ok(())
                }
            },
            ("preset", [name]) => orchestrator.apply_preset(name),
            ("process", _) => orchestrator.submit().await,
            ("save", args) => {
                let dir = args.first().copied().unwrap_or(".");
                orchestrator.export_processed(Path::new(dir)).map(|path| {
                    println!("saved {}", path.display());
                })
            }
            ("reset", _) => orchestrator.reset(),
            ("quit" | "exit", _) => break,
            _ => {
                println!("unknown command — type `help`");
                Ok(())
            }
        };

        if let Err(e) = result {
            log::error!("{e}");
        }
    }

    log::info!("voice-morph shutting down");
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn print_help() {
    println!(
        "commands:\n\
         \x20 record              start microphone capture\n\
         \x20 stop                stop capture and adopt the clip\n\
         \x20 load <path>         adopt an audio file\n\
         \x20 set <field> <val>   set shift | formant | base\n\
         \x20 preset <name>       apply a named preset\n\
         \x20 params              show the current triple\n\
         \x20 process             submit to the transformation service\n\
         \x20 save [dir]          export the processed clip\n\
         \x20 state               show the workflow state\n\
         \x20 reset               return to Idle\n\
         \x20 quit                exit"
    );
}

/// Read a file and wrap it as a clip candidate, guessing the media type from
/// the extension.  Unknown extensions become `application/octet-stream` and
/// are rejected by the resolver's audio-type check.
async fn load_clip(path: &str) -> std::io::Result<AudioArtifact> {
    let data = tokio::fs::read(path).await?;
    Ok(AudioArtifact::new(data, media_type_for(path)))
}

fn media_type_for(path: &str) -> &'static str {
    match Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("wav") => "audio/wav",
        Some("mp3") => "audio/mpeg",
        Some("ogg") => "audio/ogg",
        Some("flac") => "audio/flac",
        Some("webm") => "audio/webm",
        Some("m4a") => "audio/mp4",
        _ => "application/octet-stream",
    }
}

fn render_event(event: &WorkflowEvent) {
    match event {
        WorkflowEvent::SourceLoaded { label, size_bytes } => {
            log::info!("source loaded: {label} ({size_bytes} bytes)");
        }
        WorkflowEvent::CaptureStarted => log::info!("recording started"),
        WorkflowEvent::CaptureElapsed { display } => log::info!("recording… {display}"),
        WorkflowEvent::CaptureStopped => log::info!("recording stopped"),
        WorkflowEvent::SubmissionProgress { percent } => {
            log::info!("processing… {percent}%");
        }
        WorkflowEvent::SubmissionSucceeded => {
            log::info!("voice transformation complete — `save` to export");
        }
        WorkflowEvent::SubmissionFailed { reason } => log::error!("processing failed: {reason}"),
        WorkflowEvent::SubmissionProgressCleared => {}
        WorkflowEvent::ParameterChanged { params } => {
            log::info!(
                "parameters: shift={:.1} formant={:.1} base={}",
                params.pitch_shift,
                params.formant_shift,
                params.base_frequency
            );
        }
        WorkflowEvent::WorkflowReset => log::info!("workflow reset"),
    }
}
