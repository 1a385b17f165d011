use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::handlers::{auth, health, me, posts};
use crate::rate_limit::limit_auth;
use crate::{auth::refresh_session, AppState};

pub fn router(state: AppState) -> Router {
    // Only the credential-accepting endpoints are throttled.
    let throttled = Router::new()
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route_layer(middleware::from_fn_with_state(state.clone(), limit_auth));

    Router::new()
        .merge(throttled)
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/me", get(me::get_me).patch(me::update_me).delete(me::delete_me))
        .route("/api/posts", get(posts::list_posts).post(posts::create_post))
        .route(
            "/api/posts/:id",
            get(posts::get_post)
                .patch(posts::update_post)
                .delete(posts::delete_post),
        )
        .route("/health", get(health::health))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(middleware::from_fn_with_state(state.clone(), refresh_session)),
        )
        .with_state(state)
}
