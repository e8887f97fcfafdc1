use axum::{
    Router,
    http::HeaderValue,
    middleware,
    routing::{delete, get, patch, post},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub mod auth;
mod crud;
mod error;
pub mod rate_limit;
mod reviews;
mod tours;
mod types;
mod users;
mod views;

pub use error::ApiError;
pub use types::ApiResponse;

pub fn router(state: Arc<AppState>) -> Router {
    let public_routes = Router::new()
        .route("/users/signup", post(auth::signup))
        .route("/users/login", post(auth::login))
        .route("/users/logout", get(auth::logout))
        .route("/users/forgotPassword", post(auth::forgot_password))
        .route("/users/resetPassword/{token}", patch(auth::reset_password))
        .route("/tours", get(tours::list_tours))
        .route("/tours/top-5-cheap", get(tours::top_cheap_tours))
        .route("/tours/tour-stats", get(tours::get_tour_stats))
        .route("/tours/{id}", get(tours::get_tour))
        .route(
            "/tours/tours-within/{distance}/center/{latlong}/unit/{unit}",
            get(tours::tours_within),
        )
        .route(
            "/tours/distances/{latlong}/unit/{unit}",
            get(tours::get_distances),
        );

    let protected_routes = Router::new()
        .route("/tours", post(tours::create_tour))
        .route("/tours/{id}", patch(tours::update_tour))
        .route("/tours/{id}", delete(tours::delete_tour))
        .route("/tours/monthly-plan/{year}", get(tours::get_monthly_plan))
        .route("/tours/{tour_id}/reviews", get(reviews::list_tour_reviews))
        .route("/tours/{tour_id}/reviews", post(reviews::create_tour_review))
        .route("/users/me", get(users::get_me))
        .route("/users/updateMe", patch(users::update_me))
        .route("/users/deleteMe", delete(users::delete_me))
        .route("/users/updatePassword", patch(auth::update_password))
        .route("/users", get(users::list_users))
        .route("/users", post(users::create_user))
        .route("/users/{id}", get(users::get_user))
        .route("/users/{id}", patch(users::update_user))
        .route("/users/{id}", delete(users::delete_user))
        .route("/reviews", get(reviews::list_reviews))
        .route("/reviews", post(reviews::create_review))
        .route("/reviews/{id}", get(reviews::get_review))
        .route("/reviews/{id}", patch(reviews::update_review))
        .route("/reviews/{id}", delete(reviews::delete_review))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::protect,
        ));

    let api_router = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit::rate_limit_middleware,
        ));

    let cors_origins = &state.config.server.cors_allowed_origins;
    let cors_layer = if cors_origins.contains(&"*".to_string()) {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> =
            cors_origins.iter().filter_map(|s| s.parse().ok()).collect();
        CorsLayer::new().allow_origin(origins)
    };

    Router::new()
        .nest("/api/v1", api_router)
        .route("/", get(views::overview))
        .route("/tour/{slug}", get(views::tour_detail))
        .layer(cors_layer.allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
