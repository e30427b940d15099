use rocket::{
    form::Form,
    request::FlashMessage,
    response::{Flash, Redirect},
    serde::json::Json,
    Route, State,
};

use crate::{
    election::{designate_candidates, import_roster, results, AdminError},
    error::Result,
    model::{api::AdminView, store::Store},
};

pub fn routes() -> Vec<Route> {
    routes![admin_page, admin_update]
}

/// The admin form. Either field may be left out; an empty file or a blank
/// candidate list counts as left out.
#[derive(Debug, FromForm)]
pub struct AdminForm<'r> {
    pub file: Option<&'r [u8]>,
    pub candidate_ids: Option<&'r str>,
}

#[get("/admin")]
pub async fn admin_page(
    flash: Option<FlashMessage<'_>>,
    store: &State<Store>,
) -> Result<Json<AdminView>> {
    let results = results(store.inner().as_ref()).await?;
    Ok(Json(AdminView {
        results,
        message: flash.map(Into::into),
    }))
}

/// Import a roster and/or designate candidates, in that order. A failed step
/// stops the request; any step that already completed stays done and is
/// reported alongside the error.
#[post("/admin", data = "<form>")]
pub async fn admin_update(
    form: Form<AdminForm<'_>>,
    store: &State<Store>,
) -> Result<Flash<Redirect>> {
    let store = store.inner().as_ref();
    let roster = form.file.filter(|file| !file.is_empty());
    let candidate_ids = form.candidate_ids.filter(|ids| !ids.trim().is_empty());

    let mut done: Vec<String> = Vec::new();
    let mut failed = None;

    if let Some(roster) = roster {
        match import_roster(store, roster).await {
            Ok(_) => done.push("Voters uploaded successfully.".to_string()),
            Err(err) => failed = Some(err),
        }
    }
    if let (None, Some(candidate_ids)) = (&failed, candidate_ids) {
        match designate_candidates(store, candidate_ids).await {
            Ok(_) => done.push("Candidates set successfully.".to_string()),
            Err(err) => failed = Some(err),
        }
    }

    let redirect = Redirect::to(uri!(admin_page));
    match failed {
        Some(AdminError::Store(err)) => Err(err),
        Some(err) => {
            done.push(err.to_string());
            Ok(Flash::error(redirect, done.join(" ")))
        }
        None if done.is_empty() => Ok(Flash::error(
            redirect,
            "Nothing to do: upload a roster or list candidate IDs.",
        )),
        None => Ok(Flash::success(redirect, done.join(" "))),
    }
}
