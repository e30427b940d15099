use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::NaiveDate;
use rocket::{http::Status, tokio::sync::RwLock};

use crate::error::{Error, Result};
use crate::model::{
    ballot::Selection,
    tally::{CandidateResult, TallyEntry},
    voter::{NewVoter, Voter, VoterId},
};

use super::VotingStore;

/// The registry and tallies behind a [`MemoryStore`].
#[derive(Debug, Default)]
struct Registry {
    voters: BTreeMap<VoterId, Voter>,
    tallies: BTreeMap<VoterId, i64>,
}

/// An in-process store. Every operation holds the lock for its whole
/// duration, which makes each one atomic.
///
/// Cloning yields another handle on the same data.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Registry>>,
}

impl MemoryStore {
    /// Create a store holding the given voters and no votes.
    pub fn with_voters(voters: impl IntoIterator<Item = Voter>) -> Self {
        let registry = Registry {
            voters: voters.into_iter().map(|voter| (voter.id, voter)).collect(),
            tallies: BTreeMap::new(),
        };
        Self {
            inner: Arc::new(RwLock::new(registry)),
        }
    }
}

#[rocket::async_trait]
impl VotingStore for MemoryStore {
    async fn voter(&self, id: VoterId) -> Result<Option<Voter>> {
        Ok(self.inner.read().await.voters.get(&id).cloned())
    }

    async fn eligible_voter(&self, id: VoterId, dob: NaiveDate) -> Result<Option<Voter>> {
        let registry = self.inner.read().await;
        Ok(registry
            .voters
            .get(&id)
            .filter(|voter| voter.can_log_in(id, dob))
            .cloned())
    }

    async fn candidates(&self) -> Result<Vec<Voter>> {
        let registry = self.inner.read().await;
        Ok(registry
            .voters
            .values()
            .filter(|voter| voter.is_candidate)
            .cloned()
            .collect())
    }

    async fn record_ballot(&self, voter_id: VoterId, selection: &Selection) -> Result<bool> {
        let mut registry = self.inner.write().await;

        match registry.voters.get_mut(&voter_id) {
            Some(voter) if !voter.has_voted => voter.has_voted = true,
            _ => return Ok(false),
        }
        for candidate in selection.iter() {
            *registry.tallies.entry(*candidate).or_insert(0) += 1;
        }

        Ok(true)
    }

    async fn existing_voter_ids(&self, ids: &[VoterId]) -> Result<Vec<VoterId>> {
        let registry = self.inner.read().await;
        Ok(ids
            .iter()
            .copied()
            .filter(|id| registry.voters.contains_key(id))
            .collect())
    }

    async fn insert_voters(&self, voters: Vec<NewVoter>) -> Result<u64> {
        let mut registry = self.inner.write().await;

        // Check everything before touching anything.
        if let Some(voter) = voters
            .iter()
            .find(|voter| registry.voters.contains_key(&voter.id))
        {
            return Err(Error::Status(
                Status::Conflict,
                format!("Voter {} already exists", voter.id),
            ));
        }

        let count = voters.len() as u64;
        for voter in voters {
            registry.voters.insert(voter.id, voter.into());
        }
        Ok(count)
    }

    async fn designate_candidates(&self, ids: &[VoterId]) -> Result<u64> {
        let ids: BTreeSet<VoterId> = ids.iter().copied().collect();
        let mut registry = self.inner.write().await;
        let mut matched = 0;
        for id in &ids {
            if let Some(voter) = registry.voters.get_mut(id) {
                voter.is_candidate = true;
                matched += 1;
            }
        }
        Ok(matched)
    }

    #[cfg(test)]
    async fn tallies(&self) -> Result<Vec<TallyEntry>> {
        let registry = self.inner.read().await;
        Ok(registry
            .tallies
            .iter()
            .map(|(candidate_id, count)| TallyEntry {
                candidate_id: *candidate_id,
                count: *count,
            })
            .collect())
    }

    async fn results(&self) -> Result<Vec<CandidateResult>> {
        let registry = self.inner.read().await;
        Ok(registry
            .voters
            .values()
            .filter(|voter| voter.is_candidate)
            .map(|candidate| {
                let entry = registry.tallies.get(&candidate.id).map(|count| TallyEntry {
                    candidate_id: candidate.id,
                    count: *count,
                });
                CandidateResult::join(candidate.clone(), entry.as_ref())
            })
            .collect())
    }
}
