use thiserror::Error;

use crate::error::Error;
use crate::model::{
    roster::{read_roster, RosterError},
    store::VotingStore,
    tally::{rank, CandidateResult},
    voter::VoterId,
};

#[derive(Debug, Error)]
pub enum AdminError {
    #[error(transparent)]
    Roster(#[from] RosterError),
    #[error("Voter {0} is already registered; no voters were uploaded.")]
    DuplicateVoter(VoterId),
    #[error(transparent)]
    CandidateList(#[from] CandidateListError),
    #[error(transparent)]
    Store(#[from] Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid candidate ID {0:?}; expected a comma-separated list of IDs.")]
pub struct CandidateListError(pub String);

/// Register every voter in a roster file, all or nothing.
///
/// The whole roster is validated, and checked against the registry, before
/// anything is written. Returns the number of voters registered.
pub async fn import_roster(store: &dyn VotingStore, roster: &[u8]) -> Result<u64, AdminError> {
    let voters = read_roster(roster)?;

    let ids: Vec<VoterId> = voters.iter().map(|voter| voter.id).collect();
    if let Some(id) = store.existing_voter_ids(&ids).await?.into_iter().min() {
        warn!("Rejected roster: voter {id} already registered");
        return Err(AdminError::DuplicateVoter(id));
    }

    let count = store.insert_voters(voters).await?;
    info!("Imported {count} voters");
    Ok(count)
}

/// Parse a comma-separated list of voter IDs, ignoring blank entries.
pub fn parse_candidate_ids(list: &str) -> Result<Vec<VoterId>, CandidateListError> {
    list.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            entry
                .parse::<VoterId>()
                .map_err(|_| CandidateListError(entry.to_string()))
        })
        .collect()
}

/// Flag the listed voters as candidates. Unknown IDs are ignored and repeating
/// a designation changes nothing. Returns how many listed voters exist.
pub async fn designate_candidates(store: &dyn VotingStore, list: &str) -> Result<u64, AdminError> {
    let ids = parse_candidate_ids(list)?;
    let matched = store.designate_candidates(&ids).await?;
    info!(
        "Designated candidates: {matched} of {} listed IDs matched a voter",
        ids.len()
    );
    Ok(matched)
}

/// Every candidate with their vote count, including those without votes,
/// most votes first.
pub async fn results(store: &dyn VotingStore) -> Result<Vec<CandidateResult>, Error> {
    let mut results = store.results().await?;
    rank(&mut results);
    Ok(results)
}
