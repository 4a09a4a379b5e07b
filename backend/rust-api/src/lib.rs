use axum::{
    http::{header, Method},
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub mod config;
pub mod handlers;
pub mod metrics;
pub mod middlewares;
pub mod models;
pub mod services;
pub mod utils;

pub use config::Config;
pub use services::question::LongTextQuestion;
pub use services::AppState;

pub fn create_router(app_state: Arc<AppState>) -> Router {
    // Content runtimes embed the widget from other origins
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
        .allow_origin(tower_http::cors::Any);

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(handlers::metrics_handler))
        .nest("/api/v1/questions", question_routes().layer(cors))
        .with_state(app_state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(middleware::from_fn(
                    middlewares::metrics::metrics_middleware,
                ))
                .layer(middleware::from_fn(
                    middlewares::trace::trace_context_middleware,
                )),
        )
}

fn question_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(handlers::questions::open_question))
        .route(
            "/{id}",
            get(handlers::questions::get_question).delete(handlers::questions::close_question),
        )
        .route("/{id}/edit", post(handlers::questions::edit_answer))
        .route("/{id}/blur", post(handlers::questions::blur_answer))
        .route("/{id}/submit", post(handlers::questions::submit_answer))
        .route(
            "/{id}/show-question",
            post(handlers::questions::show_question),
        )
        .route("/{id}/show-answer", post(handlers::questions::show_answer))
        .route("/{id}/xapi", get(handlers::questions::get_xapi_data))
        .route("/{id}/state", get(handlers::questions::get_persisted_state))
        .route(
            "/{id}/statements",
            get(handlers::statements::statement_stream),
        )
}
