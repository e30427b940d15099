use std::sync::Arc;

use chrono::NaiveDate;

use crate::error::Result;
#[cfg(test)]
use crate::model::tally::TallyEntry;
use crate::model::{
    ballot::Selection,
    tally::CandidateResult,
    voter::{NewVoter, Voter, VoterId},
};

mod memory;
pub use memory::MemoryStore;

/// A shareable handle on whichever store the server was configured with.
/// This becomes managed state, created once at ignition.
pub type Store = Arc<dyn VotingStore>;

/// The durable state of the election: the voter registry and the tally store.
///
/// Every method is a single unit of work. Methods that touch more than one
/// record either apply completely or not at all.
#[rocket::async_trait]
pub trait VotingStore: Send + Sync {
    /// Look up a voter by ID.
    async fn voter(&self, id: VoterId) -> Result<Option<Voter>>;

    /// Look up a voter matching both credentials who has not voted yet.
    async fn eligible_voter(&self, id: VoterId, dob: NaiveDate) -> Result<Option<Voter>>;

    /// All voters flagged as candidates, ordered by ID.
    async fn candidates(&self) -> Result<Vec<Voter>>;

    /// Apply a ballot: increment the tally of every selected candidate and
    /// mark the voter as having voted.
    ///
    /// The voted flag is set with a conditional write; if the voter has
    /// already voted (or does not exist) nothing changes and `false` is
    /// returned.
    async fn record_ballot(&self, voter_id: VoterId, selection: &Selection) -> Result<bool>;

    /// Which of the given IDs are already in the registry.
    async fn existing_voter_ids(&self, ids: &[VoterId]) -> Result<Vec<VoterId>>;

    /// Insert new voters, all or nothing. Returns the number inserted.
    async fn insert_voters(&self, voters: Vec<NewVoter>) -> Result<u64>;

    /// Flag every existing voter with one of the given IDs as a candidate.
    /// Returns how many voters matched.
    async fn designate_candidates(&self, ids: &[VoterId]) -> Result<u64>;

    /// All tally entries.
    #[cfg(test)]
    async fn tallies(&self) -> Result<Vec<TallyEntry>>;

    /// Every candidate joined against its tally, zero if it has none. Unordered.
    async fn results(&self) -> Result<Vec<CandidateResult>>;
}
