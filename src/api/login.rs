use rocket::{
    form::Form,
    http::{CookieJar, Status},
    request::FlashMessage,
    response::{Flash, Redirect},
    serde::json::Json,
    Either, Route, State,
};

use crate::{
    election::{check_credentials, LoginError},
    error::Result,
    model::{api::LoginView, session::VoterSession, store::Store, voter::VoterId},
    Config,
};

pub fn routes() -> Vec<Route> {
    routes![login_page, login, logout]
}

/// The credentials a voter logs in with. Both fields are validated by the
/// login check itself so that a bad date gets its own message.
#[derive(Debug, FromForm)]
pub struct Credentials<'r> {
    pub id: &'r str,
    pub dob: &'r str,
}

#[get("/login")]
pub fn login_page(flash: Option<FlashMessage<'_>>) -> Json<LoginView> {
    Json(LoginView {
        message: flash.map(Into::into),
    })
}

#[post("/login", data = "<credentials>")]
pub async fn login(
    credentials: Form<Credentials<'_>>,
    cookies: &CookieJar<'_>,
    store: &State<Store>,
    config: &State<Config>,
) -> Result<Either<Redirect, Flash<Redirect>>> {
    match check_credentials(store.inner().as_ref(), credentials.id, credentials.dob).await {
        Ok(voter) => {
            cookies.add_private(VoterSession::new(voter.id).into_cookie(config));
            Ok(Either::Left(Redirect::to(uri!(
                super::ballot::ballot_page(voter.id)
            ))))
        }
        Err(LoginError::Store(err)) => Err(err),
        Err(err) => Ok(Either::Right(Flash::error(
            Redirect::to(uri!(login_page)),
            err.to_string(),
        ))),
    }
}

#[delete("/login")]
pub fn logout(cookies: &CookieJar<'_>) -> Status {
    VoterSession::clear(cookies);
    Status::Ok
}
