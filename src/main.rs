use anyhow::Result;
use clap::Parser;
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};
use voice_chat_client::{
    AudioOutput, AudioSource, CaptureBackendFactory, Config, CpalOutput, NullOutput,
    SessionCommand, SessionComponents, SessionConfig, SessionController, SessionSnapshot,
    WebSocketConnector,
};

/// Terminal voice chat client for a pipecat backend
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Config file (extension optional)
    #[arg(long, default_value = "config/voice-chat")]
    config: String,

    /// Backend websocket URL
    #[arg(long)]
    url: Option<String>,

    /// Stream this WAV file instead of the microphone
    #[arg(long)]
    input: Option<PathBuf>,

    /// Do not play received audio
    #[arg(long)]
    no_playback: bool,

    /// frames.proto to verify the wire schema against
    #[arg(long)]
    schema: Option<PathBuf>,

    /// Print session snapshots as JSON lines
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let cfg = Config::load(&args.config)?;

    info!("{} v{}", cfg.service.name, env!("CARGO_PKG_VERSION"));

    let mut session_config = SessionConfig::from(&cfg);
    if let Some(url) = args.url {
        session_config.transport.url = url;
    }
    if let Some(schema) = args.schema {
        session_config.schema_path = Some(schema);
    }
    info!("Backend: {}", session_config.transport.url);

    let source = match args.input {
        Some(path) => AudioSource::File {
            path,
            realtime: true,
        },
        None => AudioSource::Microphone,
    };

    let audio_output: Arc<dyn AudioOutput> = if args.no_playback || !cfg.audio.playback {
        Arc::new(NullOutput::new())
    } else {
        match CpalOutput::open() {
            Ok(output) => Arc::new(output),
            Err(e) => {
                warn!("Audio output unavailable ({}), replies will not be heard", e);
                Arc::new(NullOutput::new())
            }
        }
    };

    let components = SessionComponents {
        connector: Arc::new(WebSocketConnector::default()),
        capture_backend: CaptureBackendFactory::create(source, session_config.capture.clone()),
        audio_output,
    };

    let mut controller = SessionController::new(session_config, components);
    let snapshots = controller.subscribe();
    controller.start();

    let (commands_tx, commands_rx) = mpsc::channel(8);
    let stdin_tx = commands_tx.clone();
    std::thread::Builder::new()
        .name("stdin".to_string())
        .spawn(move || read_commands(stdin_tx))?;
    tokio::spawn(render(snapshots, args.json));

    let ctrl_c_tx = commands_tx;
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = ctrl_c_tx.send(SessionCommand::Shutdown).await;
        }
    });

    println!("Press Enter to start/stop speaking, q + Enter to quit.");
    controller.run(commands_rx).await;

    let stats = controller.stats();
    info!(
        "Session {} finished: {:.1}s, {} transcript lines",
        stats.session_id, stats.duration_secs, stats.transcript_entries
    );

    Ok(())
}

/// Enter toggles capture, "q" quits
///
/// Runs on a plain thread: a blocked stdin read must not hold up runtime shutdown.
fn read_commands(commands: mpsc::Sender<SessionCommand>) {
    for line in std::io::stdin().lock().lines() {
        let Ok(line) = line else {
            break;
        };
        let command = match line.trim() {
            "q" | "quit" => SessionCommand::Shutdown,
            _ => SessionCommand::ToggleCapture,
        };
        if commands.blocking_send(command).is_err() || command == SessionCommand::Shutdown {
            return;
        }
    }

    let _ = commands.blocking_send(SessionCommand::Shutdown);
}

async fn render(mut snapshots: watch::Receiver<SessionSnapshot>, json: bool) {
    let mut printed = 0;

    loop {
        let snapshot = snapshots.borrow_and_update().clone();

        if json {
            match serde_json::to_string(&snapshot) {
                Ok(line) => println!("{}", line),
                Err(e) => warn!("Failed to serialize snapshot: {}", e),
            }
        } else {
            for entry in snapshot.transcript.iter().skip(printed) {
                let who = match entry.sender {
                    voice_chat_client::session::Sender::Ai => "AI",
                    voice_chat_client::session::Sender::User => "You",
                };
                println!("{}: {}", who, entry.text);
            }
            println!("[{}]", snapshot.status);
        }
        printed = snapshot.transcript.len();

        if snapshots.changed().await.is_err() {
            break;
        }
    }
}
