//! Default-router style entity routes: a collection and a detail path per entity, trailing slash included.
//! Parameterized paths hand the segment to the handlers, which resolve the entity descriptor.

use crate::handlers::{api_root, create, destroy, list, partial_update, retrieve, update};
use crate::state::AppState;
use axum::{routing::get, Router};

pub fn entity_routes(state: AppState) -> Router {
    Router::new()
        .route("/", get(api_root))
        .route("/:path_segment/", get(list).post(create))
        .route(
            "/:path_segment/:id/",
            get(retrieve).put(update).patch(partial_update).delete(destroy),
        )
        .with_state(state)
}
