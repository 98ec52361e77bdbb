//! Neuroscreen entrypoint: score a session, finalize a stored one, fit cached
//! weights offline, or report model health.

use clap::{Parser, Subcommand};
use neuroscreen::{
    config::EngineConfig,
    ensemble::CalibrationLoss,
    features::Modality,
    logging::{LogEvent, StructuredLogger},
    scoring::{CalibrationSet, ScoringEngine},
    session::{AssessmentSession, RecordPayload, SessionRequest, StageRecord},
    storage::AssessmentStore,
    EngineError,
};
use std::path::{Path, PathBuf};
use tracing::info;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Parser)]
#[command(name = "neuroscreen", version, about = "Multi-modal screening engine")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Score every stage in a request file, store the results and finalize
    Score { request: PathBuf },
    /// Finalize a session from its stored stage records
    Complete { session_id: String },
    /// Fit a weight vector for one modality against a labeled set
    Calibrate {
        modality: Modality,
        dataset: PathBuf,
        out: PathBuf,
        /// Minimize error rate at this threshold instead of Brier loss
        #[arg(long)]
        error_rate: Option<f64>,
    },
    /// Print classifier load status
    Health,
}

fn open_store(config: &EngineConfig) -> Result<AssessmentStore, BoxError> {
    let secret = std::env::var(&config.store.secret_env)
        .map_err(|_| format!("{} must hold the record store secret", config.store.secret_env))?;
    Ok(AssessmentStore::open(&config.store.path, secret.as_bytes())?)
}

/// Finalize once. The assessment goes to stdout; audit lines go to stderr.
fn finalize_and_store(
    engine: &ScoringEngine,
    store: &AssessmentStore,
    session: &AssessmentSession,
) -> Result<(), BoxError> {
    let assessment = engine.finalize(session)?;
    if !session.is_finalized() {
        store.append(&StageRecord::new(
            session.session_id.clone(),
            RecordPayload::Final(assessment.clone()),
        ))?;
        let event = LogEvent::final_decision(&session.session_id, &assessment);
        StructuredLogger::emit_json(&event, &mut std::io::stderr().lock())?;
    }
    StructuredLogger::emit_json(&assessment, &mut std::io::stdout().lock())?;
    Ok(())
}

fn score(engine: &ScoringEngine, store: &AssessmentStore, request: &Path) -> Result<(), BoxError> {
    let data = std::fs::read_to_string(request)?;
    let request: SessionRequest = serde_json::from_str(&data)?;
    if let Some(id) = &request.session_id {
        if store.is_finalized(id)? {
            return Err(EngineError::AlreadyFinalized(id.clone()).into());
        }
    }
    let (session, failures) = engine.score_request(&request);

    let mut audit = std::io::stderr().lock();
    for failure in &failures {
        let mut event = LogEvent::new("warn", "stage failed", &session.session_id);
        event.modality = Some(failure.modality.as_str());
        event.error = Some(failure.source.to_string());
        StructuredLogger::emit_json(&event, &mut audit)?;
    }
    for modality in session.stages_present() {
        if let Some(result) = session.get(modality) {
            store.append(&StageRecord::new(
                session.session_id.clone(),
                RecordPayload::Stage(result.clone()),
            ))?;
            let mut event = LogEvent::new("info", "stage scored", &session.session_id);
            event.modality = Some(modality.as_str());
            event.probability = Some(result.probability);
            StructuredLogger::emit_json(&event, &mut audit)?;
        }
    }
    drop(audit);
    finalize_and_store(engine, store, &session)
}

fn complete(engine: &ScoringEngine, store: &AssessmentStore, session_id: &str) -> Result<(), BoxError> {
    let records = store.records_for_session(session_id)?;
    let session = AssessmentSession::from_records(session_id, &records)?;
    info!(
        session_id,
        stages = session.stages_present().len(),
        finalized = session.is_finalized(),
        "completing session"
    );
    finalize_and_store(engine, store, &session)
}

fn calibrate(
    engine: &ScoringEngine,
    modality: Modality,
    dataset: &Path,
    out: &Path,
    error_rate: Option<f64>,
) -> Result<(), BoxError> {
    let set: CalibrationSet = serde_json::from_str(&std::fs::read_to_string(dataset)?)?;
    let loss = match error_rate {
        Some(threshold) => CalibrationLoss::ErrorRate { threshold },
        None => CalibrationLoss::Brier,
    };
    let run = engine.calibrate(modality, &set, loss)?;
    run.weights.save(out)?;
    StructuredLogger::emit_json(&run, &mut std::io::stdout().lock())?;
    Ok(())
}

fn main() -> Result<(), BoxError> {
    let cli = Cli::parse();

    let config_path = std::env::var("NEUROSCREEN_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("neuroscreen.json"));
    let config = EngineConfig::load(&config_path)?;

    StructuredLogger::init(config.log.json, &config.log.level);
    info!(config = %config_path.display(), "neuroscreen starting");

    let engine = ScoringEngine::new(&config)?;
    info!(models_loaded = engine.registry().models_loaded(), "models ready");

    match cli.command {
        Command::Score { request } => score(&engine, &open_store(&config)?, &request),
        Command::Complete { session_id } => complete(&engine, &open_store(&config)?, &session_id),
        Command::Calibrate {
            modality,
            dataset,
            out,
            error_rate,
        } => calibrate(&engine, modality, &dataset, &out, error_rate),
        Command::Health => {
            let health = serde_json::json!({
                "status": "ok",
                "models_loaded": engine.registry().models_loaded(),
                "models": engine.registry().status(),
            });
            StructuredLogger::emit_json(&health, &mut std::io::stdout().lock())?;
            Ok(())
        }
    }
}
