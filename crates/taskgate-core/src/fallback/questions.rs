use crate::domain::{
    DisputeCategory, DisputeContext, EvidenceKind, EvidenceQuestion, EvidenceQuestions, Party,
    Proposal,
};

const CONFIDENCE: f64 = 0.40;

fn q(text: String, addressed_to: Party, evidence_kind: EvidenceKind) -> EvidenceQuestion {
    EvidenceQuestion {
        text,
        addressed_to,
        evidence_kind,
    }
}

/// Category templates: three or four questions, split between both parties.
pub fn evidence_questions(ctx: &DisputeContext) -> Proposal<EvidenceQuestions> {
    use EvidenceKind::*;
    use Party::*;

    let title = &ctx.task_title;
    let questions = match ctx.category {
        DisputeCategory::NotCompleted => vec![
            q(format!("Which parts of \"{title}\" were left unfinished?"), Client, Statement),
            q(format!("Please upload photos showing the current state of \"{title}\"."), Client, Photo),
            q("When did you start and stop work, and why did you stop?".to_string(), Worker, Timeline),
            q("Please share any messages in which the scope was agreed or changed.".to_string(), Worker, Document),
        ],
        DisputeCategory::QualityIssue => vec![
            q("What specifically does not meet the agreed standard?".to_string(), Client, Statement),
            q("Please upload photos of the work you consider unsatisfactory.".to_string(), Client, Photo),
            q(format!("Please upload photos taken when you finished \"{title}\"."), Worker, Photo),
        ],
        DisputeCategory::Damage => vec![
            q("What was damaged, and when did you first notice it?".to_string(), Client, Statement),
            q("Please upload photos of the damage.".to_string(), Client, Photo),
            q("Please provide a receipt or estimate for the repair or replacement.".to_string(), Client, Document),
            q("Describe how the item was handled during the task.".to_string(), Worker, Statement),
        ],
        DisputeCategory::NoShow => vec![
            q("What time did you expect the worker to arrive?".to_string(), Client, Timeline),
            q("When did you arrive, or when did you tell the client you could not attend?".to_string(), Worker, Timeline),
            q("Please share any messages or call logs around the scheduled time.".to_string(), Worker, Document),
        ],
        DisputeCategory::PaymentIssue => vec![
            q("What amount was agreed, and where was it agreed?".to_string(), Worker, Document),
            q("What amount do you believe is owed, and why?".to_string(), Client, Statement),
            q("Were any extra costs or hours added after the task was booked?".to_string(), Worker, Timeline),
        ],
        DisputeCategory::Other => vec![
            q(format!("In your own words, what went wrong with \"{title}\"?"), ctx.opened_by, Statement),
            q("What outcome would resolve this dispute for you?".to_string(), ctx.opened_by, Statement),
            q("Please upload any photos or documents that support your account.".to_string(), Client, Document),
            q("Please upload any photos or documents that support your account.".to_string(), Worker, Document),
        ],
    };

    Proposal::deterministic(
        EvidenceQuestions { questions },
        CONFIDENCE.min(super::FALLBACK_CONFIDENCE_CAP),
        format!("standard evidence checklist for {:?} disputes", ctx.category),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MAX_EVIDENCE_QUESTIONS;

    #[test]
    fn test_every_category_yields_bounded_questions_for_both_parties() {
        for category in [
            DisputeCategory::NotCompleted,
            DisputeCategory::QualityIssue,
            DisputeCategory::Damage,
            DisputeCategory::NoShow,
            DisputeCategory::PaymentIssue,
            DisputeCategory::Other,
        ] {
            let ctx = DisputeContext {
                dispute_id: "d-1".into(),
                task_id: "t-1".into(),
                category,
                task_title: "Fence repair".into(),
                opened_by: Party::Client,
            };
            let p = evidence_questions(&ctx);
            let qs = &p.payload.questions;
            assert!((3..=4).contains(&qs.len()), "{category:?}");
            assert!(qs.len() <= MAX_EVIDENCE_QUESTIONS);
            assert!(qs.iter().any(|q| q.addressed_to == Party::Client));
            assert!(qs.iter().any(|q| q.addressed_to == Party::Worker));
            assert_eq!(p.confidence, 0.40);
        }
    }
}
