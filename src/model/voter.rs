use std::fmt::{Display, Formatter};
use std::num::ParseIntError;
use std::str::FromStr;

use chrono::NaiveDate;
use mongodb::bson::Bson;
use rocket::{
    form::{self, prelude::ErrorKind, FromFormField, ValueField},
    http::{
        impl_from_uri_param_identity,
        uri::fmt::{Path, UriDisplay},
    },
    request::FromParam,
};
use serde::{Deserialize, Serialize};

/// The textual format of a date of birth, both on the wire and in storage.
pub const DOB_FORMAT: &str = "%Y-%m-%d";

/// Parse a `YYYY-MM-DD` date of birth. Surrounding whitespace is an error.
pub fn parse_dob(dob: &str) -> Result<NaiveDate, chrono::ParseError> {
    NaiveDate::parse_from_str(dob, DOB_FORMAT)
}

/// An externally assigned voter ID, unique for the lifetime of the election.
/// Candidates are voters, so this also identifies candidates.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VoterId(i64);

impl VoterId {
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    pub fn get(self) -> i64 {
        self.0
    }
}

impl Display for VoterId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for VoterId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.trim().parse::<i64>()?))
    }
}

impl From<VoterId> for Bson {
    fn from(id: VoterId) -> Self {
        Bson::Int64(id.0)
    }
}

impl<'a> FromParam<'a> for VoterId {
    type Error = ParseIntError;

    fn from_param(param: &'a str) -> Result<Self, Self::Error> {
        param.parse::<VoterId>()
    }
}

#[rocket::async_trait]
impl<'r> FromFormField<'r> for VoterId {
    fn from_value(field: ValueField<'r>) -> form::Result<'r, Self> {
        field.value.parse::<VoterId>().map_err(|err| {
            let error = ErrorKind::Custom(Box::new(err));
            error.into()
        })
    }
}

impl UriDisplay<Path> for VoterId {
    fn fmt(&self, formatter: &mut rocket::http::uri::fmt::Formatter<'_, Path>) -> std::fmt::Result {
        formatter.write_value(self.0)
    }
}

impl_from_uri_param_identity!([Path] VoterId);

/// Core voter data, as stored in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voter {
    #[serde(rename = "_id")]
    pub id: VoterId,
    pub name: String,
    /// Second authentication factor.
    pub dob: NaiveDate,
    /// Only ever transitions from `false` to `true`.
    pub has_voted: bool,
    /// Only ever transitions from `false` to `true`.
    pub is_candidate: bool,
}

impl Voter {
    /// Does this voter match the given credentials and still have a ballot to cast?
    pub fn can_log_in(&self, id: VoterId, dob: NaiveDate) -> bool {
        self.id == id && self.dob == dob && !self.has_voted
    }
}

/// A voter as read from a roster, before insertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewVoter {
    pub id: VoterId,
    pub name: String,
    pub dob: NaiveDate,
}

impl From<NewVoter> for Voter {
    fn from(voter: NewVoter) -> Self {
        Self {
            id: voter.id,
            name: voter.name,
            dob: voter.dob,
            has_voted: false,
            is_candidate: false,
        }
    }
}

/// Example data for tests.
#[cfg(test)]
pub(crate) mod examples {
    use super::*;

    /// Number of voters in the example roster.
    pub const EXAMPLE_VOTERS: i64 = 13;

    /// Number of candidates in the example roster; IDs `1..=EXAMPLE_CANDIDATES`.
    pub const EXAMPLE_CANDIDATES: i64 = 11;

    impl NewVoter {
        pub fn example(id: i64) -> Self {
            Self {
                id: VoterId::new(id),
                name: format!("Voter {id}"),
                dob: NaiveDate::from_ymd_opt(1970 + id as i32, 1 + (id % 12) as u32, 1).unwrap(),
            }
        }

        /// The example roster: voters `1..=EXAMPLE_VOTERS`.
        pub fn examples() -> Vec<Self> {
            (1..=EXAMPLE_VOTERS).map(Self::example).collect()
        }
    }

    impl Voter {
        /// The example roster with the candidates designated.
        pub fn examples() -> Vec<Self> {
            NewVoter::examples()
                .into_iter()
                .map(|voter| {
                    let mut voter = Voter::from(voter);
                    voter.is_candidate = voter.id.get() <= EXAMPLE_CANDIDATES;
                    voter
                })
                .collect()
        }
    }
}
