use rocket::Route;

pub mod admin;
pub mod ballot;
pub mod login;

pub fn routes() -> Vec<Route> {
    let mut routes = Vec::new();
    routes.extend(admin::routes());
    routes.extend(ballot::routes());
    routes.extend(login::routes());
    routes
}
