use thiserror::Error;

use crate::error::Error;
use crate::model::{
    store::VotingStore,
    voter::{parse_dob, Voter, VoterId},
};

#[derive(Debug, Error)]
pub enum LoginError {
    #[error("Invalid date format.")]
    DateFormat,
    /// Wrong ID, wrong date of birth, and already voted are deliberately
    /// indistinguishable.
    #[error("Invalid ID, DOB, or you have already voted.")]
    InvalidCredentials,
    #[error(transparent)]
    Store(#[from] Error),
}

/// Check a claimed identity against the registry.
///
/// Succeeds iff the ID and date of birth match a voter exactly and that voter
/// has not voted yet. The date is validated before the registry is consulted.
pub async fn check_credentials(
    store: &dyn VotingStore,
    id: &str,
    dob: &str,
) -> Result<Voter, LoginError> {
    let dob = parse_dob(dob).map_err(|_| LoginError::DateFormat)?;
    let Ok(id) = id.parse::<VoterId>() else {
        return Err(LoginError::InvalidCredentials);
    };

    match store.eligible_voter(id, dob).await? {
        Some(voter) => {
            info!("Voter {id} logged in");
            Ok(voter)
        }
        None => {
            warn!("Rejected login attempt for voter ID {id}");
            Err(LoginError::InvalidCredentials)
        }
    }
}
