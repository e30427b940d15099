use rocket::{
    http::{Cookie, CookieJar, SameSite, Status},
    outcome::{try_outcome, IntoOutcome},
    request::{FromRequest, Outcome},
    Request,
};
use thiserror::Error;

use crate::error::Error;
use crate::model::voter::VoterId;
use crate::Config;

pub const VOTER_SESSION_COOKIE: &str = "voter_session";

/// Proof that the bearer passed the login check as a specific voter.
/// Carried in a private (encrypted) cookie.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoterSession {
    voter_id: VoterId,
}

impl VoterSession {
    pub fn new(voter_id: VoterId) -> Self {
        Self { voter_id }
    }

    /// Ensure this session belongs to the given voter.
    pub fn require(&self, voter_id: VoterId) -> Result<(), Error> {
        if self.voter_id == voter_id {
            Ok(())
        } else {
            Err(Error::Status(
                Status::Unauthorized,
                format!("Session for voter {} cannot access voter {voter_id}", self.voter_id),
            ))
        }
    }

    /// Convert into a cookie, to be added with [`CookieJar::add_private`].
    pub fn into_cookie(self, config: &Config) -> Cookie<'static> {
        Cookie::build(VOTER_SESSION_COOKIE, self.voter_id.to_string())
            .max_age(config.auth_ttl())
            .http_only(true)
            .same_site(SameSite::Strict)
            .finish()
    }

    /// End any session held in the given jar.
    pub fn clear(cookies: &CookieJar<'_>) {
        cookies.remove_private(Cookie::named(VOTER_SESSION_COOKIE));
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for VoterSession {
    type Error = SessionError;

    /// Get the session from the private cookie.
    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let cookie = try_outcome!(req
            .cookies()
            .get_private(VOTER_SESSION_COOKIE)
            .into_outcome((Status::Unauthorized, SessionError::Missing)));

        let voter_id = try_outcome!(cookie
            .value()
            .parse::<VoterId>()
            .map_err(|_| SessionError::Malformed)
            .into_outcome(Status::BadRequest));

        Outcome::Success(Self::new(voter_id))
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Missing `voter_session` cookie")]
    Missing,
    #[error("Malformed `voter_session` cookie")]
    Malformed,
}
