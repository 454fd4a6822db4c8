//! Candidate ranking for task assignment.

use serde::{Deserialize, Serialize};

/// A worker who applied to, or is eligible for, a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateProfile {
    pub worker_id: String,
    /// Average review rating, 0–5.
    pub rating: f64,
    /// Fraction of accepted tasks completed, 0–1.
    pub completion_rate: f64,
    pub distance_km: f64,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub completed_tasks: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingRequest {
    pub task_id: String,
    #[serde(default)]
    pub required_skills: Vec<String>,
    pub candidates: Vec<CandidateProfile>,
    /// Maximum number of ranked candidates to return; `None` returns all.
    #[serde(default)]
    pub limit: Option<usize>,
}

impl RankingRequest {
    pub fn knows(&self, worker_id: &str) -> bool {
        self.candidates.iter().any(|c| c.worker_id == worker_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedCandidate {
    pub worker_id: String,
    /// Suitability score, 0–1.
    pub score: f64,
    #[serde(default)]
    pub reasons: Vec<String>,
}

/// Candidates ordered best first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateRanking {
    pub ranked: Vec<RankedCandidate>,
}
