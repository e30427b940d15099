use std::collections::BTreeSet;
use std::ops::Deref;

use thiserror::Error;

use crate::model::voter::VoterId;

/// The exact number of candidates every ballot must select.
pub const BALLOT_SIZE: usize = 9;

/// A validated ballot: exactly [`BALLOT_SIZE`] distinct, known candidates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection(Vec<VoterId>);

impl Selection {
    /// Validate a submitted selection against the current candidate list.
    ///
    /// Nothing is persisted here; a rejected selection leaves no trace.
    pub fn validate(
        selected: Vec<VoterId>,
        candidates: &BTreeSet<VoterId>,
    ) -> Result<Self, SelectionError> {
        if selected.len() != BALLOT_SIZE {
            return Err(SelectionError::WrongSize(selected.len()));
        }

        let mut seen = BTreeSet::new();
        for id in &selected {
            if !seen.insert(*id) {
                return Err(SelectionError::Duplicate(*id));
            }
            if !candidates.contains(id) {
                return Err(SelectionError::UnknownCandidate(*id));
            }
        }

        Ok(Self(selected))
    }
}

impl Deref for Selection {
    type Target = [VoterId];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Reasons a submitted selection is not a valid ballot.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("You must select exactly 9 candidates.")]
    WrongSize(usize),
    #[error("Each candidate may only be selected once.")]
    Duplicate(VoterId),
    #[error("Unknown candidate {0}.")]
    UnknownCandidate(VoterId),
}
