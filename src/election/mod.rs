//! The election's operations, independent of the HTTP surface.
//!
//! Each operation takes an explicit store handle and returns a domain error
//! whose `Display` is the message shown to the user. Store failures are
//! carried through untouched so the caller can treat them as fatal.

mod admin;
mod ballot;
mod login;

pub use admin::{
    designate_candidates, import_roster, parse_candidate_ids, results, AdminError,
    CandidateListError,
};
pub use ballot::{ballot_candidates, cast_ballot, BallotError};
pub use login::{check_credentials, LoginError};
