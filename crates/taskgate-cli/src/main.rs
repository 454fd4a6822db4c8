//! Taskgate - decision pipeline CLI
//!
//! The `taskgate` command runs the marketplace decision pipeline against JSON
//! inputs and inspects the audit trail.
//!
//! ## Commands
//!
//! - `routes`: Show route bindings, fallback chains, and provider status
//! - `synthesize`: Produce a fraud verdict from identity signals
//! - `validate`: Run a proposal through the deterministic validator
//! - `price` / `rank` / `questions`: Model-assisted proposals with fallback
//! - `audit`: List, show, and override audit records

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, Level};

use taskgate_core::audit::{AuditId, AuditStore, DecisionAuditLog, SubjectRef};
use taskgate_core::domain::{
    DisputeContext, PricingRequest, Proposal, ProposalSource, RankingRequest,
};
use taskgate_core::router::{ModelRouter, ProviderCredentials, Route};
use taskgate_core::obs::DecisionSpan;
use taskgate_core::synthesis::{SignalSet, SignalSynthesizer};
use taskgate_core::telemetry::{init_tracing, LogFormat};
use taskgate_core::validator::{ProposalValidator, ValidatorProfile};
use taskgate_core::{DecisionAssistant, PipelineConfig};
use taskgate_store::SurrealAuditStore;

#[derive(Parser)]
#[command(name = "taskgate")]
#[command(author = "Taskgate Engineering")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "AI-assisted decision pipeline for the task marketplace", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// Pipeline configuration file (TOML)
    #[arg(short, long, global = true, env = "TASKGATE_CONFIG")]
    config: Option<PathBuf>,

    /// Audit database directory (ignored when SURREALDB_URL is set)
    #[arg(long, global = true, env = "TASKGATE_DB", default_value = ".taskgate/audit")]
    db: PathBuf,

    /// Keep the audit trail in memory for this invocation only
    #[arg(long, global = true)]
    memory: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show route bindings, fallback chains, and whether each route can be served
    Routes,

    /// Synthesize a fraud verdict from a signal set (JSON)
    Synthesize {
        /// Path to the signal set file
        #[arg(short, long)]
        signals: PathBuf,
    },

    /// Validate a proposal (JSON: payload, confidence, reasoning)
    Validate {
        /// Path to the proposal file
        #[arg(short, long)]
        proposal: PathBuf,

        /// Rule set to apply
        #[arg(short, long, value_enum, default_value = "pricing")]
        domain: ValidationDomain,

        /// Subject kind recorded in the audit trail
        #[arg(long, default_value = "task")]
        subject_kind: String,

        /// Subject id recorded in the audit trail
        #[arg(long)]
        subject_id: String,
    },

    /// Suggest a price for a task
    Price {
        /// Path to the pricing request file
        #[arg(short, long)]
        request: PathBuf,
    },

    /// Rank candidate workers for a task
    Rank {
        /// Path to the ranking request file
        #[arg(short, long)]
        request: PathBuf,
    },

    /// Suggest evidence questions for a dispute
    Questions {
        /// Path to the dispute context file
        #[arg(short, long)]
        dispute: PathBuf,
    },

    /// Inspect and annotate the audit trail
    Audit {
        #[command(subcommand)]
        action: AuditAction,
    },
}

#[derive(Subcommand)]
enum AuditAction {
    /// List records about a subject, oldest first
    List {
        /// Subject kind (task, user, dispute, ...)
        #[arg(long)]
        kind: String,

        /// Subject id
        #[arg(long)]
        id: String,
    },

    /// Show one record and any overrides that reference it
    Show {
        /// Audit record id
        audit_id: String,
    },

    /// Record a human reviewer's decision about a record
    Override {
        /// Audit record id
        audit_id: String,

        /// Reviewer identity
        #[arg(long)]
        reviewer: String,

        /// Reviewer decision
        #[arg(long, value_enum)]
        decision: ReviewDecision,

        /// Why the reviewer decided this way
        #[arg(long)]
        reason: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ValidationDomain {
    Pricing,
    Ranking,
    EvidenceQuestions,
}

#[derive(Clone, Copy, ValueEnum)]
enum ReviewDecision {
    Accept,
    Reject,
}

/// Proposal file format; `source` defaults to deterministic.
#[derive(Deserialize)]
struct ProposalFile {
    payload: Value,
    confidence: f64,
    reasoning: String,
    #[serde(default)]
    source: Option<ProposalSource>,
}

/// Everything a command needs, built once per invocation.
struct Pipeline {
    config: PipelineConfig,
    router: Arc<ModelRouter>,
    audit: DecisionAuditLog,
}

impl Pipeline {
    async fn open(cli: &Cli) -> Result<Self> {
        let config = match &cli.config {
            Some(path) => PipelineConfig::load(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => PipelineConfig::default(),
        };
        let router = ModelRouter::from_config(&config.router, ProviderCredentials::from_env())
            .context("Failed to build model router")?;

        let store: Arc<dyn AuditStore> = if cli.memory {
            Arc::new(SurrealAuditStore::in_memory().await?)
        } else {
            Arc::new(
                SurrealAuditStore::from_env(&cli.db)
                    .await
                    .context("Failed to open audit database")?,
            )
        };
        Ok(Self::new(config, Arc::new(router), store))
    }

    fn new(config: PipelineConfig, router: Arc<ModelRouter>, store: Arc<dyn AuditStore>) -> Self {
        Self {
            config,
            router,
            audit: DecisionAuditLog::spawn(store),
        }
    }

    fn assistant(&self) -> DecisionAssistant {
        DecisionAssistant::new(
            self.config.pricing.clone(),
            self.config.advisory.clone(),
            self.audit.clone(),
        )
        .with_router(Arc::clone(&self.router))
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Invalid JSON in {}", path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    init_tracing(LogFormat::from_json_flag(cli.json), level);

    let pipeline = Pipeline::open(&cli).await?;

    let outcome = match &cli.command {
        Commands::Routes => Ok(cmd_routes(&pipeline)),
        Commands::Synthesize { signals } => cmd_synthesize(&pipeline, signals).await,
        Commands::Validate {
            proposal,
            domain,
            subject_kind,
            subject_id,
        } => cmd_validate(
            &pipeline,
            proposal,
            *domain,
            SubjectRef::new(subject_kind.clone(), subject_id.clone()),
        ),
        Commands::Price { request } => cmd_price(&pipeline, request).await,
        Commands::Rank { request } => cmd_rank(&pipeline, request).await,
        Commands::Questions { dispute } => cmd_questions(&pipeline, dispute).await,
        Commands::Audit { action } => match action {
            AuditAction::List { kind, id } => cmd_audit_list(&pipeline, kind, id).await,
            AuditAction::Show { audit_id } => cmd_audit_show(&pipeline, audit_id).await,
            AuditAction::Override {
                audit_id,
                reviewer,
                decision,
                reason,
            } => cmd_audit_override(&pipeline, audit_id, reviewer, *decision, reason).await,
        },
    };

    // Appends are queued; persist them before the process exits.
    pipeline.audit.flush().await;

    let output = outcome?;
    println!("{}", serde_json::to_string_pretty(&output.body)?);
    if let Some(failure) = output.failure {
        anyhow::bail!(failure);
    }
    Ok(())
}

/// Command result: the JSON to print, plus an error to exit with after printing.
struct Output {
    body: Value,
    failure: Option<String>,
}

impl Output {
    fn ok(body: Value) -> Self {
        Self {
            body,
            failure: None,
        }
    }
}

fn cmd_routes(pipeline: &Pipeline) -> Output {
    let routes: Vec<Value> = Route::ALL
        .into_iter()
        .map(|route| {
            let binding = pipeline.router.bindings().get(&route);
            json!({
                "route": route,
                "provider": binding.map(|b| b.provider.as_str()),
                "model": binding.map(|b| b.model.as_str()),
                "configured": pipeline.router.is_route_configured(route),
                "fallback_chain": pipeline.router.chain_for(route),
            })
        })
        .collect();
    Output::ok(json!({
        "any_configured": pipeline.router.is_configured(),
        "routes": routes,
    }))
}

async fn cmd_synthesize(pipeline: &Pipeline, path: &Path) -> Result<Output> {
    let signals: SignalSet = read_json(path)?;
    let synth = SignalSynthesizer::new(pipeline.config.synthesis.clone(), pipeline.audit.clone())
        .context("Invalid synthesis configuration")?
        .with_router(Arc::clone(&pipeline.router));
    let verdict = synth.synthesize_verdict(&signals).await?;
    info!(
        "Verdict for {}: {} ({:.2})",
        verdict.subject_id,
        verdict.verdict.as_str(),
        verdict.confidence
    );
    Ok(Output::ok(serde_json::to_value(&verdict)?))
}

fn cmd_validate(
    pipeline: &Pipeline,
    path: &Path,
    domain: ValidationDomain,
    subject: SubjectRef,
) -> Result<Output> {
    let file: ProposalFile = read_json(path)?;
    let proposal = Proposal::new(
        file.payload,
        file.confidence,
        file.reasoning,
        file.source.unwrap_or(ProposalSource::Deterministic),
    );

    let advisory = &pipeline.config.advisory;
    let profile = match domain {
        ValidationDomain::Pricing => ValidatorProfile::pricing(&pipeline.config.pricing),
        ValidationDomain::Ranking => ValidatorProfile::advisory(
            "ranking",
            advisory.min_confidence,
            advisory.min_rationale_chars,
        ),
        ValidationDomain::EvidenceQuestions => ValidatorProfile::advisory(
            "evidence_questions",
            advisory.min_confidence,
            advisory.min_rationale_chars,
        ),
    };
    let _span = DecisionSpan::enter(&profile.domain, &subject.id);
    let validator = ProposalValidator::new(profile, pipeline.audit.clone());
    let result = validator.validate(subject, &proposal);

    let failure = result
        .accepted_proposal(&proposal)
        .err()
        .map(|err| err.to_string());
    Ok(Output {
        body: serde_json::to_value(&result)?,
        failure,
    })
}

async fn cmd_price(pipeline: &Pipeline, path: &Path) -> Result<Output> {
    let request: PricingRequest = read_json(path)?;
    let outcome = pipeline.assistant().suggest_price(&request).await;
    Ok(Output::ok(serde_json::to_value(&outcome)?))
}

async fn cmd_rank(pipeline: &Pipeline, path: &Path) -> Result<Output> {
    let request: RankingRequest = read_json(path)?;
    let outcome = pipeline.assistant().rank_candidates(&request).await;
    Ok(Output::ok(serde_json::to_value(&outcome)?))
}

async fn cmd_questions(pipeline: &Pipeline, path: &Path) -> Result<Output> {
    let ctx: DisputeContext = read_json(path)?;
    let outcome = pipeline.assistant().evidence_questions(&ctx).await;
    Ok(Output::ok(serde_json::to_value(&outcome)?))
}

async fn cmd_audit_list(pipeline: &Pipeline, kind: &str, id: &str) -> Result<Output> {
    let records = pipeline
        .audit
        .store()
        .list_for_subject(&SubjectRef::new(kind, id))
        .await?;
    if records.is_empty() {
        info!("No audit records for {}:{}", kind, id);
    }
    Ok(Output::ok(serde_json::to_value(&records)?))
}

async fn cmd_audit_show(pipeline: &Pipeline, audit_id: &str) -> Result<Output> {
    let id = AuditId(audit_id.to_string());
    let store = pipeline.audit.store();
    let record = store
        .get(&id)
        .await
        .with_context(|| format!("Audit record {audit_id} not found"))?;
    let overrides = store.overrides_for(&id).await?;
    Ok(Output::ok(json!({
        "record": record,
        "overrides": overrides,
    })))
}

async fn cmd_audit_override(
    pipeline: &Pipeline,
    audit_id: &str,
    reviewer: &str,
    decision: ReviewDecision,
    reason: &str,
) -> Result<Output> {
    let accepted = matches!(decision, ReviewDecision::Accept);
    let addendum = pipeline
        .audit
        .record_override(&AuditId(audit_id.to_string()), reviewer, accepted, reason)
        .await
        .with_context(|| format!("Failed to record override for {audit_id}"))?;
    info!("Recorded override {} for {}", addendum.audit_id, audit_id);
    Ok(Output::ok(serde_json::to_value(&addendum)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskgate_store::fakes::MemoryAuditStore;

    fn pipeline() -> (Pipeline, Arc<MemoryAuditStore>) {
        let store = Arc::new(MemoryAuditStore::new());
        let router = ModelRouter::from_config(
            &PipelineConfig::default().router,
            ProviderCredentials::default(),
        )
        .unwrap();
        (
            Pipeline::new(PipelineConfig::default(), Arc::new(router), store.clone()),
            store,
        )
    }

    fn write(dir: &tempfile::TempDir, name: &str, body: Value) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, body.to_string()).unwrap();
        path
    }

    #[test]
    fn test_cli_parses_override() {
        let cli = Cli::try_parse_from([
            "taskgate",
            "--memory",
            "audit",
            "override",
            "a-1",
            "--reviewer",
            "ops",
            "--decision",
            "reject",
            "--reason",
            "duplicate account",
        ])
        .unwrap();
        assert!(cli.memory);
        assert!(matches!(
            cli.command,
            Commands::Audit {
                action: AuditAction::Override {
                    decision: ReviewDecision::Reject,
                    ..
                }
            }
        ));
    }

    #[tokio::test]
    async fn test_routes_without_credentials_are_unconfigured() {
        let (pipeline, _) = pipeline();
        let output = cmd_routes(&pipeline);
        assert_eq!(output.body["any_configured"], false);
        assert_eq!(output.body["routes"][0]["route"], "primary");
        assert_eq!(output.body["routes"][0]["model"], "gpt-4o");
        assert_eq!(output.body["routes"][0]["fallback_chain"], json!(["backup", "fast"]));
    }

    #[tokio::test]
    async fn test_synthesize_then_list_audit() {
        let (pipeline, _) = pipeline();
        let dir = tempfile::tempdir().unwrap();
        let signals = write(
            &dir,
            "signals.json",
            json!({
                "subject_id": "u-cli",
                "document": {"status": "unavailable", "reason": "not submitted"},
                "biometric": {"status": "available", "signals": {
                    "face_match_score": 0.97, "liveness_score": 0.96, "spoof_detected": false}},
                "device": {"status": "available", "signals": {
                    "reputation_score": 0.9, "vpn_or_proxy": false, "emulator": false,
                    "accounts_on_device": 1}}
            }),
        );

        let output = cmd_synthesize(&pipeline, &signals).await.unwrap();
        assert_eq!(output.body["verdict"], "APPROVE");

        pipeline.audit.flush().await;
        let listed = cmd_audit_list(&pipeline, "user", "u-cli").await.unwrap();
        assert_eq!(listed.body.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_validate_reports_failure_after_auditing() {
        let (pipeline, store) = pipeline();
        let dir = tempfile::tempdir().unwrap();
        let proposal = write(
            &dir,
            "proposal.json",
            json!({
                "payload": {"price_cents": 100000, "platform_fee_cents": 15000, "price_tier": "premium"},
                "confidence": 0.9,
                "reasoning": "multi-day renovation with materials"
            }),
        );

        let output = cmd_validate(
            &pipeline,
            &proposal,
            ValidationDomain::Pricing,
            SubjectRef::new("task", "t-cli"),
        )
        .unwrap();
        assert_eq!(output.body["valid"], false);
        assert!(output.failure.unwrap().contains("above_max"));

        pipeline.audit.flush().await;
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_price_falls_back_then_override() {
        let (pipeline, store) = pipeline();
        let dir = tempfile::tempdir().unwrap();
        let request = write(
            &dir,
            "request.json",
            json!({"task_id": "t-p", "category": "delivery", "title": "Grocery run",
                   "estimated_minutes": 45}),
        );

        let output = cmd_price(&pipeline, &request).await.unwrap();
        assert_eq!(output.body["proposal"]["source"]["type"], "deterministic");
        let audit_id = output.body["audit_id"].as_str().unwrap().to_string();

        let addendum = cmd_audit_override(
            &pipeline,
            &audit_id,
            "ops",
            ReviewDecision::Accept,
            "price matches recent deliveries",
        )
        .await
        .unwrap();
        assert_eq!(addendum.body["accepted"], true);

        let shown = cmd_audit_show(&pipeline, &audit_id).await.unwrap();
        assert_eq!(shown.body["overrides"].as_array().unwrap().len(), 1);
        assert_eq!(store.len(), 2);
    }
}
