use std::cmp::Ordering;

use crate::domain::{CandidateProfile, CandidateRanking, Proposal, RankedCandidate, RankingRequest};

const CONFIDENCE: f64 = 0.45;
/// Distance at which proximity contributes nothing.
const MAX_USEFUL_DISTANCE_KM: f64 = 50.0;

fn finite_or_zero(v: f64) -> f64 {
    if v.is_finite() {
        v
    } else {
        0.0
    }
}

fn skill_overlap(required: &[String], candidate: &CandidateProfile) -> f64 {
    if required.is_empty() {
        return 1.0;
    }
    let matched = required
        .iter()
        .filter(|skill| {
            candidate
                .skills
                .iter()
                .any(|s| s.eq_ignore_ascii_case(skill))
        })
        .count();
    matched as f64 / required.len() as f64
}

fn score(request: &RankingRequest, c: &CandidateProfile) -> RankedCandidate {
    let rating = finite_or_zero(c.rating).clamp(0.0, 5.0) / 5.0;
    let completion = finite_or_zero(c.completion_rate).clamp(0.0, 1.0);
    let skills = skill_overlap(&request.required_skills, c);
    let distance = finite_or_zero(c.distance_km).max(0.0);
    let proximity = (1.0 - distance / MAX_USEFUL_DISTANCE_KM).max(0.0);

    let total = 0.35 * rating + 0.25 * completion + 0.25 * skills + 0.15 * proximity;

    let mut reasons = vec![format!("rating {:.1}/5", rating * 5.0)];
    reasons.push(format!("{:.0}% completion", completion * 100.0));
    if !request.required_skills.is_empty() {
        reasons.push(format!("{:.0}% skill match", skills * 100.0));
    }
    reasons.push(format!("{distance:.1} km away"));

    RankedCandidate {
        worker_id: c.worker_id.clone(),
        score: total.clamp(0.0, 1.0),
        reasons,
    }
}

/// Weighted heuristic over rating, completion rate, skill overlap, and
/// proximity. Ties are broken by worker id.
pub fn rank_candidates(request: &RankingRequest) -> Proposal<CandidateRanking> {
    let mut ranked: Vec<RankedCandidate> =
        request.candidates.iter().map(|c| score(request, c)).collect();
    ranked.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.worker_id.cmp(&b.worker_id))
    });
    if let Some(limit) = request.limit {
        ranked.truncate(limit);
    }

    let confidence = if request.candidates.is_empty() {
        0.0
    } else {
        CONFIDENCE.min(super::FALLBACK_CONFIDENCE_CAP)
    };
    let reasoning = format!(
        "heuristic ranking of {} candidate(s): 35% rating, 25% completion, 25% skills, 15% proximity",
        request.candidates.len()
    );

    Proposal::deterministic(CandidateRanking { ranked }, confidence, reasoning)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(id: &str, rating: f64, completion: f64, km: f64, skills: &[&str]) -> CandidateProfile {
        CandidateProfile {
            worker_id: id.into(),
            rating,
            completion_rate: completion,
            distance_km: km,
            skills: skills.iter().map(|s| s.to_string()).collect(),
            completed_tasks: 10,
        }
    }

    #[test]
    fn test_ranking_orders_best_first_and_breaks_ties_by_id() {
        let request = RankingRequest {
            task_id: "t-1".into(),
            required_skills: vec!["plumbing".into()],
            candidates: vec![
                candidate("w-b", 4.0, 0.9, 5.0, &["plumbing"]),
                candidate("w-a", 4.0, 0.9, 5.0, &["Plumbing"]),
                candidate("w-c", 5.0, 1.0, 0.0, &[]),
                candidate("w-d", 2.0, 0.5, 40.0, &[]),
            ],
            limit: None,
        };
        let ranking = rank_candidates(&request);
        let order: Vec<&str> = ranking.payload.ranked.iter().map(|r| r.worker_id.as_str()).collect();
        assert_eq!(order, vec!["w-a", "w-b", "w-c", "w-d"]);
        assert_eq!(ranking.confidence, 0.45);
    }

    #[test]
    fn test_limit_and_empty_pool() {
        let request = RankingRequest {
            task_id: "t-1".into(),
            required_skills: vec![],
            candidates: vec![
                candidate("w-1", 3.0, 0.5, 1.0, &[]),
                candidate("w-2", 5.0, 1.0, 1.0, &[]),
            ],
            limit: Some(1),
        };
        let ranking = rank_candidates(&request);
        assert_eq!(ranking.payload.ranked.len(), 1);
        assert_eq!(ranking.payload.ranked[0].worker_id, "w-2");

        let empty = rank_candidates(&RankingRequest {
            task_id: "t-2".into(),
            required_skills: vec![],
            candidates: vec![],
            limit: None,
        });
        assert!(empty.payload.ranked.is_empty());
        assert_eq!(empty.confidence, 0.0);
    }
}
