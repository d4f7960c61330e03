use rocket::Route;

mod elections;
mod results;
mod voting;

pub fn routes() -> Vec<Route> {
    let mut routes = Vec::new();
    routes.extend(voting::routes());
    routes.extend(results::routes());
    routes.extend(elections::routes());
    routes
}
