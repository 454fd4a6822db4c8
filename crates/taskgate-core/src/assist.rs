//! Model-assisted marketplace proposals: price hints, candidate rankings,
//! and dispute evidence questions.
//!
//! Every capability follows the same path: ask the router for a JSON
//! proposal, decode it against the capability's schema, fall back to the
//! deterministic engine when anything goes wrong, run the deterministic
//! validator, and append exactly one audit record.

use std::collections::HashSet;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use taskgate_store::{AuditId, SubjectRef};
use tracing::Instrument;

use crate::audit::DecisionAuditLog;
use crate::config::AdvisoryBounds;
use crate::domain::{
    CandidateRanking, DisputeContext, EvidenceQuestions, PriceHint, PricingBounds,
    PricingRequest, Proposal, ProposalSource, RankingRequest, MAX_EVIDENCE_QUESTIONS,
};
use crate::fallback;
use crate::metrics::METRICS;
use crate::obs;
use crate::router::{CallOptions, ModelRouter, Route};
use crate::validator::{ProposalValidator, ValidationResult, ValidatorProfile};

const AGENT: &str = "decision_assistant";

const PRICING_DOMAIN: &str = "pricing";
const RANKING_DOMAIN: &str = "ranking";
const QUESTIONS_DOMAIN: &str = "evidence_questions";

const PRICING_SYSTEM: &str = "You price tasks for a local gig marketplace. \
Respond with a JSON object: {\"price_cents\": integer, \"platform_fee_cents\": integer, \
\"price_tier\": \"budget\"|\"standard\"|\"premium\", \"confidence\": number in [0,1], \
\"reasoning\": string}.";

const RANKING_SYSTEM: &str = "You rank workers for a task on a local gig marketplace. \
Only use the worker ids you are given, each at most once, best first. \
Respond with a JSON object: {\"ranked\": [{\"worker_id\": string, \"score\": number in [0,1], \
\"reasons\": [string]}], \"confidence\": number in [0,1], \"reasoning\": string}.";

const QUESTIONS_SYSTEM: &str = "You help a marketplace mediator collect evidence for a dispute. \
Ask neutral questions of both parties. Respond with a JSON object: {\"questions\": \
[{\"text\": string, \"addressed_to\": \"client\"|\"worker\", \
\"evidence_kind\": \"photo\"|\"document\"|\"statement\"|\"timeline\"}], \
\"confidence\": number in [0,1], \"reasoning\": string}.";

/// A proposal after validation, with the audit record describing it.
#[derive(Debug, Clone, Serialize)]
pub struct AssistOutcome<P> {
    /// The proposal to act on. Carries validator corrections when the
    /// corrected payload still decodes as `P`.
    pub proposal: Proposal<P>,
    pub validation: ValidationResult,
    pub audit_id: AuditId,
}

impl<P> AssistOutcome<P> {
    /// Whether the proposal may be applied without human review.
    pub fn accepted(&self) -> bool {
        self.validation.valid
    }

    pub fn from_model(&self) -> bool {
        self.proposal.source.is_model()
    }
}

/// Model reply shape shared by all capabilities: the payload fields plus
/// `confidence` and `reasoning` at the top level.
#[derive(Debug, Deserialize)]
struct ModelEnvelope<P> {
    #[serde(flatten)]
    payload: P,
    confidence: f64,
    reasoning: String,
}

fn decode_envelope<P: DeserializeOwned>(data: Value) -> Result<ModelEnvelope<P>, Vec<String>> {
    let envelope: ModelEnvelope<P> =
        serde_json::from_value(data).map_err(|err| vec![err.to_string()])?;
    if !(0.0..=1.0).contains(&envelope.confidence) {
        return Err(vec![format!(
            "confidence {} must lie within [0, 1]",
            envelope.confidence
        )]);
    }
    if envelope.reasoning.trim().is_empty() {
        return Err(vec!["reasoning must not be empty".to_string()]);
    }
    Ok(envelope)
}

fn check_ranking(request: &RankingRequest, ranking: &CandidateRanking) -> Result<(), Vec<String>> {
    let mut problems = Vec::new();
    let mut seen = HashSet::new();
    for entry in &ranking.ranked {
        if !request.knows(&entry.worker_id) {
            problems.push(format!("unknown worker_id {}", entry.worker_id));
        }
        if !seen.insert(entry.worker_id.as_str()) {
            problems.push(format!("duplicate worker_id {}", entry.worker_id));
        }
        if !(0.0..=1.0).contains(&entry.score) {
            problems.push(format!("score for {} must lie within [0, 1]", entry.worker_id));
        }
    }
    if let Some(limit) = request.limit {
        if ranking.ranked.len() > limit {
            problems.push(format!(
                "{} candidates ranked, limit is {limit}",
                ranking.ranked.len()
            ));
        }
    }
    if problems.is_empty() {
        Ok(())
    } else {
        Err(problems)
    }
}

fn check_questions(questions: &EvidenceQuestions) -> Result<(), Vec<String>> {
    let count = questions.questions.len();
    if count == 0 || count > MAX_EVIDENCE_QUESTIONS {
        return Err(vec![format!(
            "expected 1 to {MAX_EVIDENCE_QUESTIONS} questions, got {count}"
        )]);
    }
    if questions.questions.iter().any(|q| q.text.trim().is_empty()) {
        return Err(vec!["question text must not be empty".to_string()]);
    }
    Ok(())
}

/// Model-first proposal generation with deterministic fallback and
/// validation for the advisory marketplace capabilities.
pub struct DecisionAssistant {
    router: Option<Arc<ModelRouter>>,
    pricing_bounds: PricingBounds,
    pricing: ProposalValidator,
    ranking: ProposalValidator,
    questions: ProposalValidator,
}

impl DecisionAssistant {
    pub fn new(pricing: PricingBounds, advisory: AdvisoryBounds, audit: DecisionAuditLog) -> Self {
        let validator = |profile| ProposalValidator::new(profile, audit.clone()).with_agent(AGENT);
        Self {
            router: None,
            pricing: validator(ValidatorProfile::pricing(&pricing)),
            ranking: validator(ValidatorProfile::advisory(
                RANKING_DOMAIN,
                advisory.min_confidence,
                advisory.min_rationale_chars,
            )),
            questions: validator(ValidatorProfile::advisory(
                QUESTIONS_DOMAIN,
                advisory.min_confidence,
                advisory.min_rationale_chars,
            )),
            pricing_bounds: pricing,
        }
    }

    pub fn with_router(mut self, router: Arc<ModelRouter>) -> Self {
        self.router = Some(router);
        self
    }

    /// Price hint for a task (fast route).
    pub async fn suggest_price(&self, request: &PricingRequest) -> AssistOutcome<PriceHint> {
        let subject = SubjectRef::new("task", request.task_id.clone());
        async {
            let prompt = format!(
                "Suggest a price for this task.\nTask: {}\nBounds: min {} cents, max {} cents, \
                 platform fee {:.0}% of price.",
                serde_json::to_string(request).unwrap_or_default(),
                self.pricing_bounds.min_price_cents,
                self.pricing_bounds.max_price_cents,
                self.pricing_bounds.platform_fee_rate * 100.0,
            );
            let proposal = match self
                .propose::<PriceHint>(PRICING_DOMAIN, Route::Fast, PRICING_SYSTEM, prompt, |_| Ok(()))
                .await
            {
                Ok(proposal) => proposal,
                Err(reason) => {
                    self.note_fallback(PRICING_DOMAIN, &reason);
                    fallback::pricing_hint(request, &self.pricing_bounds)
                }
            };
            self.finish(&self.pricing, subject, proposal)
        }
        .instrument(obs::decision_span(PRICING_DOMAIN, &request.task_id))
        .await
    }

    /// Ordered shortlist of candidates for a task (primary route). Model
    /// rankings naming unknown or repeated workers are discarded.
    pub async fn rank_candidates(&self, request: &RankingRequest) -> AssistOutcome<CandidateRanking> {
        let subject = SubjectRef::new("task", request.task_id.clone());
        async {
            let prompt = format!(
                "Rank these candidates for the task.\n{}",
                serde_json::to_string(request).unwrap_or_default()
            );
            let proposal = match self
                .propose::<CandidateRanking>(RANKING_DOMAIN, Route::Primary, RANKING_SYSTEM, prompt, |r| {
                    check_ranking(request, r)
                })
                .await
            {
                Ok(proposal) => proposal,
                Err(reason) => {
                    self.note_fallback(RANKING_DOMAIN, &reason);
                    fallback::rank_candidates(request)
                }
            };
            self.finish(&self.ranking, subject, proposal)
        }
        .instrument(obs::decision_span(RANKING_DOMAIN, &request.task_id))
        .await
    }

    /// Evidence questions for a dispute (fast route).
    pub async fn evidence_questions(&self, ctx: &DisputeContext) -> AssistOutcome<EvidenceQuestions> {
        let subject = SubjectRef::new("dispute", ctx.dispute_id.clone());
        async {
            let prompt = format!(
                "Suggest up to {MAX_EVIDENCE_QUESTIONS} evidence questions for this dispute.\n{}",
                serde_json::to_string(ctx).unwrap_or_default()
            );
            let proposal = match self
                .propose::<EvidenceQuestions>(
                    QUESTIONS_DOMAIN,
                    Route::Fast,
                    QUESTIONS_SYSTEM,
                    prompt,
                    check_questions,
                )
                .await
            {
                Ok(proposal) => proposal,
                Err(reason) => {
                    self.note_fallback(QUESTIONS_DOMAIN, &reason);
                    fallback::evidence_questions(ctx)
                }
            };
            self.finish(&self.questions, subject, proposal)
        }
        .instrument(obs::decision_span(QUESTIONS_DOMAIN, &ctx.dispute_id))
        .await
    }

    // ---- shared pipeline ----

    /// Ask the router and decode its reply. `Err` carries the fallback reason.
    async fn propose<P: DeserializeOwned>(
        &self,
        capability: &str,
        route: Route,
        system: &str,
        prompt: String,
        check: impl FnOnce(&P) -> Result<(), Vec<String>>,
    ) -> Result<Proposal<P>, String> {
        let Some(router) = self.router.as_ref().filter(|r| r.is_configured()) else {
            return Err("no inference provider configured".to_string());
        };

        let reply = router
            .call_json(CallOptions::new(route, prompt).system(system))
            .await
            .map_err(|err| err.to_string())?;

        let decoded = decode_envelope::<P>(reply.data)
            .and_then(|envelope| check(&envelope.payload).map(|()| envelope));
        match decoded {
            Ok(envelope) => Ok(Proposal::new(
                envelope.payload,
                envelope.confidence,
                envelope.reasoning,
                ProposalSource::Model {
                    provider: reply.call.provider,
                    model: reply.call.model,
                    cached: reply.call.cached,
                },
            )),
            Err(violations) => {
                METRICS.inc_model_rejections();
                obs::emit_model_response_rejected(capability, &violations);
                Err("model response failed schema validation".to_string())
            }
        }
    }

    fn note_fallback(&self, capability: &str, reason: &str) {
        METRICS.inc_fallbacks();
        obs::emit_fallback_invoked(capability, reason);
    }

    /// Validate, adopt any corrections, and audit.
    fn finish<P>(
        &self,
        validator: &ProposalValidator,
        subject: SubjectRef,
        proposal: Proposal<P>,
    ) -> AssistOutcome<P>
    where
        P: Serialize + DeserializeOwned,
    {
        let (validation, audit_id) = validator.validate_recorded(subject, &proposal);

        let proposal = match validation
            .corrected
            .as_ref()
            .map(|c| serde_json::from_value::<P>(c.payload.clone()))
        {
            Some(Ok(payload)) => Proposal {
                payload,
                ..proposal
            },
            _ => proposal,
        };

        AssistOutcome {
            proposal,
            validation,
            audit_id,
        }
    }
}
