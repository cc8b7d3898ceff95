use axum::{routing::get, Router};

use crate::state::AppState;

pub mod car;
pub mod handlers;
pub mod upload;

pub fn router() -> Router<AppState> {
	Router::new()
		.route("/", get(handlers::list_cars).post(handlers::create_car))
		.route("/public", get(handlers::public_cars))
		.route("/:id", get(handlers::get_car).delete(handlers::delete_car))
}
