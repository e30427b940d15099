use std::collections::BTreeSet;

use thiserror::Error;

use crate::error::Error;
use crate::model::{
    ballot::{Selection, SelectionError},
    store::VotingStore,
    voter::{Voter, VoterId},
};

#[derive(Debug, Error)]
pub enum BallotError {
    #[error("You have already voted.")]
    AlreadyVoted,
    #[error(transparent)]
    Selection(#[from] SelectionError),
    #[error(transparent)]
    Store(#[from] Error),
}

/// Look up a voter who is about to fill in their ballot, along with the
/// candidates they may choose from.
pub async fn ballot_candidates(
    store: &dyn VotingStore,
    voter_id: VoterId,
) -> Result<(Voter, Vec<Voter>), BallotError> {
    let voter = voter_who_can_vote(store, voter_id).await?;
    let candidates = store.candidates().await?;
    Ok((voter, candidates))
}

/// Validate a ballot and apply it to the tallies.
///
/// Either every selected candidate's tally goes up by one and the voter is
/// marked as having voted, or nothing changes at all.
pub async fn cast_ballot(
    store: &dyn VotingStore,
    voter_id: VoterId,
    selected: Vec<VoterId>,
) -> Result<(), BallotError> {
    voter_who_can_vote(store, voter_id).await?;

    let candidates: BTreeSet<VoterId> = store
        .candidates()
        .await?
        .into_iter()
        .map(|candidate| candidate.id)
        .collect();
    let selection = Selection::validate(selected, &candidates).map_err(|err| {
        warn!("Rejected ballot from voter {voter_id}: {err}");
        err
    })?;

    // A concurrent ballot from the same voter may have landed since the check above.
    if !store.record_ballot(voter_id, &selection).await? {
        warn!("Voter {voter_id} submitted a second ballot");
        return Err(BallotError::AlreadyVoted);
    }

    info!("Recorded ballot from voter {voter_id}");
    Ok(())
}

async fn voter_who_can_vote(
    store: &dyn VotingStore,
    voter_id: VoterId,
) -> Result<Voter, BallotError> {
    let voter = store
        .voter(voter_id)
        .await?
        .ok_or_else(|| Error::not_found(format!("Voter {voter_id}")))?;
    if voter.has_voted {
        return Err(BallotError::AlreadyVoted);
    }
    Ok(voter)
}
