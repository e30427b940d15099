use rocket::{
    form::Form,
    http::CookieJar,
    request::FlashMessage,
    response::{Flash, Redirect},
    serde::json::Json,
    Either, Route, State,
};

use crate::{
    election::{ballot_candidates, cast_ballot, BallotError},
    error::Result,
    model::{
        api::BallotView, ballot::BALLOT_SIZE, session::VoterSession, store::Store, voter::VoterId,
    },
};

pub fn routes() -> Vec<Route> {
    routes![ballot_page, submit_ballot]
}

/// A submitted ballot: the `candidates` field repeated once per selection.
#[derive(Debug, FromForm)]
pub struct BallotForm {
    pub candidates: Vec<VoterId>,
}

#[get("/ballot/<voter_id>")]
pub async fn ballot_page(
    voter_id: VoterId,
    session: VoterSession,
    flash: Option<FlashMessage<'_>>,
    cookies: &CookieJar<'_>,
    store: &State<Store>,
) -> Result<Either<Json<BallotView>, Flash<Redirect>>> {
    session.require(voter_id)?;

    match ballot_candidates(store.inner().as_ref(), voter_id).await {
        Ok((voter, candidates)) => Ok(Either::Left(Json(BallotView {
            voter_id,
            name: voter.name,
            ballot_size: BALLOT_SIZE,
            candidates: candidates.into_iter().map(Into::into).collect(),
            message: flash.map(Into::into),
        }))),
        Err(err) => ballot_rejected(voter_id, err, cookies).map(Either::Right),
    }
}

#[post("/ballot/<voter_id>", data = "<ballot>")]
pub async fn submit_ballot(
    voter_id: VoterId,
    session: VoterSession,
    ballot: Form<BallotForm>,
    cookies: &CookieJar<'_>,
    store: &State<Store>,
) -> Result<Flash<Redirect>> {
    session.require(voter_id)?;

    match cast_ballot(store.inner().as_ref(), voter_id, ballot.into_inner().candidates).await {
        Ok(()) => {
            VoterSession::clear(cookies);
            Ok(Flash::success(
                Redirect::to(uri!(super::login::login_page)),
                "Vote submitted successfully!",
            ))
        }
        Err(err) => ballot_rejected(voter_id, err, cookies),
    }
}

/// Send the voter wherever a rejected ballot should take them.
/// Store failures are passed on as fatal errors.
fn ballot_rejected(
    voter_id: VoterId,
    err: BallotError,
    cookies: &CookieJar<'_>,
) -> Result<Flash<Redirect>> {
    match err {
        BallotError::AlreadyVoted => {
            VoterSession::clear(cookies);
            Ok(Flash::error(
                Redirect::to(uri!(super::login::login_page)),
                err.to_string(),
            ))
        }
        BallotError::Selection(_) => Ok(Flash::error(
            Redirect::to(uri!(ballot_page(voter_id))),
            err.to_string(),
        )),
        BallotError::Store(err) => Err(err),
    }
}
