use std::cmp::Reverse;

use serde::{Deserialize, Serialize};

use crate::model::voter::{Voter, VoterId};

/// The running vote count for one candidate, as stored in the database.
///
/// Created with a count of 1 on the candidate's first vote; absent before that.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TallyEntry {
    #[serde(rename = "_id")]
    pub candidate_id: VoterId,
    pub count: i64,
}

/// One row of the results view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateResult {
    pub candidate_id: VoterId,
    pub name: String,
    pub votes: u64,
}

impl CandidateResult {
    /// Join a candidate against its tally entry, if any.
    /// Candidates without an entry have no votes yet.
    pub fn join(candidate: Voter, tally: Option<&TallyEntry>) -> Self {
        Self {
            candidate_id: candidate.id,
            name: candidate.name,
            votes: tally.map_or(0, |entry| entry.count.max(0) as u64),
        }
    }
}

/// Order results by votes, most first, breaking ties by candidate ID.
pub fn rank(results: &mut [CandidateResult]) {
    results.sort_by_key(|result| (Reverse(result.votes), result.candidate_id));
}
