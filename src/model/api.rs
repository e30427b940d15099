//! API-friendly representations of the views the server renders.

use rocket::request::FlashMessage;
use serde::{Deserialize, Serialize};

use crate::model::{
    tally::CandidateResult,
    voter::{Voter, VoterId},
};

/// A one-shot message left by the previous request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// `success` or `error`.
    pub kind: String,
    pub message: String,
}

impl From<FlashMessage<'_>> for Message {
    fn from(flash: FlashMessage<'_>) -> Self {
        Self {
            kind: flash.kind().to_string(),
            message: flash.message().to_string(),
        }
    }
}

/// The credential form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginView {
    pub message: Option<Message>,
}

/// A candidate as shown on the ballot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateDesc {
    pub id: VoterId,
    pub name: String,
}

impl From<Voter> for CandidateDesc {
    fn from(voter: Voter) -> Self {
        Self {
            id: voter.id,
            name: voter.name,
        }
    }
}

/// The ballot form for one voter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BallotView {
    pub voter_id: VoterId,
    pub name: String,
    /// How many candidates must be selected.
    pub ballot_size: usize,
    pub candidates: Vec<CandidateDesc>,
    pub message: Option<Message>,
}

/// The administrator's live results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminView {
    pub results: Vec<CandidateResult>,
    pub message: Option<Message>,
}
