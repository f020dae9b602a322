use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use interview_capture::capture::{FaceScript, ScriptedUtterance};
use interview_capture::{
    create_router, AppState, Config, ConsoleInterface, FileReportStore, GeometricClassifier,
    HttpSubmitter, NatsClient, NatsRecognizerFactory, RecognizerFactory, SessionConfig,
    SessionController, SessionDeps, SessionOutcome, SyntheticBackend, SyntheticScript,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "interview-capture", version, about = "Interview self-assessment capture")]
struct Cli {
    /// Config file (without extension)
    #[arg(short, long, default_value = "config/interview-capture")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the upload server
    Serve,

    /// Run one scripted capture session against the upload endpoint
    Simulate {
        /// Override the submission endpoint
        #[arg(long)]
        endpoint: Option<String>,

        /// Override the recording budget
        #[arg(long)]
        budget_secs: Option<u64>,

        /// Issue a user stop after this many seconds
        #[arg(long)]
        stop_after_secs: Option<u64>,

        /// Take utterances from an STT service over NATS instead of the script
        #[arg(long)]
        nats_url: Option<String>,

        /// STT session id to filter NATS transcripts by
        #[arg(long, default_value = "interview")]
        stt_session: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let cfg = Config::load(&cli.config)?;

    info!("Loaded config: {}", cfg.service.name);

    match cli.command {
        Command::Serve => serve(&cfg).await,
        Command::Simulate {
            endpoint,
            budget_secs,
            stop_after_secs,
            nats_url,
            stt_session,
        } => {
            simulate(
                &cfg,
                endpoint,
                budget_secs,
                stop_after_secs,
                nats_url,
                stt_session,
            )
            .await
        }
    }
}

async fn serve(cfg: &Config) -> Result<()> {
    let state = AppState::new(&cfg.uploads.dir).with_max_file_bytes(cfg.uploads.max_file_bytes);
    let app = create_router(state);

    let addr = cfg.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("Upload server listening on {}", addr);
    info!("Upload directory: {}", cfg.uploads.dir);

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}

fn demo_script() -> SyntheticScript {
    let utterances = [
        (8, "Hi, thank you for having me today"),
        (20, "I have spent five years building backend services"),
        (35, "most recently on a team that runs payment infrastructure"),
        (50, "I enjoy debugging hard production problems"),
        (70, "and I am looking for a role with more ownership"),
    ];

    SyntheticScript {
        utterances: utterances
            .iter()
            .map(|(at, text)| ScriptedUtterance::new(Duration::from_secs(*at), *text))
            .collect(),
        faces: [
            vec![FaceScript::NEUTRAL; 15],
            vec![FaceScript::SPEAKING; 10],
            vec![FaceScript::NoFace; 3],
            vec![FaceScript::Face { eye: 1.0, brow: 1.4, mouth: 0.2 }; 5],
        ]
        .concat(),
        ..Default::default()
    }
}

async fn simulate(
    cfg: &Config,
    endpoint: Option<String>,
    budget_secs: Option<u64>,
    stop_after_secs: Option<u64>,
    nats_url: Option<String>,
    stt_session: String,
) -> Result<()> {
    let mut session_config = SessionConfig::from(&cfg.session);
    if let Some(budget) = budget_secs {
        session_config.budget_secs = budget.max(1);
    }

    let backend = Arc::new(SyntheticBackend::new(demo_script()));
    let recognizers: Arc<dyn RecognizerFactory> = match nats_url {
        Some(url) => {
            let client = NatsClient::connect(&url, stt_session).await?;
            Arc::new(NatsRecognizerFactory::new(Arc::new(client)))
        }
        None => backend.clone() as Arc<dyn RecognizerFactory>,
    };

    let endpoint = endpoint.unwrap_or_else(|| cfg.submission.endpoint.clone());
    let submitter = HttpSubmitter::new(endpoint, Duration::from_secs(cfg.submission.timeout_secs))?;
    info!("Submitting to {}", submitter.endpoint());

    let deps = SessionDeps {
        backend: backend.clone(),
        recognizers,
        classifier: Arc::new(GeometricClassifier),
        submitter: Arc::new(submitter),
        reports: Arc::new(FileReportStore::new(&cfg.report.path)),
        ui: Arc::new(ConsoleInterface::new(true)),
    };

    let controller = SessionController::new(session_config, deps);
    let session_id = controller.start().await?;
    info!("Simulating session {}", session_id);

    if let Some(secs) = stop_after_secs {
        tokio::time::sleep(Duration::from_secs(secs)).await;
        controller.stop().await?;
    }

    let record = controller.wait().await?;
    info!("Status history: {:?}", record.history);

    match record.outcome {
        SessionOutcome::Completed { report, stored, .. } => {
            info!("Report received (stored={}):", stored);
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        other => error!("Session ended without a report: {}", other.label()),
    }

    let snapshot = backend.counters().snapshot();
    info!(
        "Released: {} live streams, {} recognizers listening",
        snapshot.live_streams(),
        snapshot.recognizers_listening
    );

    Ok(())
}
