// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{exam, quiz, streak},
    state::AppState,
    utils::jwt::auth_middleware,
};

/// Assembles the main application router.
///
/// * Question source routes are public; result and streak routes require a
///   bearer token.
/// * Applies global middleware (Trace, CORS).
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin([
            HeaderValue::from_static("http://localhost:3000"),
            HeaderValue::from_static("http://127.0.0.1:3000"),
        ])
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let auth = middleware::from_fn_with_state(state.clone(), auth_middleware);

    let exam_routes = Router::new()
        .route("/{subject}", get(exam::get_exam_questions))
        .merge(
            Router::new()
                .route("/save-result", post(exam::save_exam_result))
                .route("/history/all", get(exam::get_exam_history))
                .layer(auth.clone()),
        );

    let quiz_routes = Router::new()
        .route("/{subject}", get(quiz::get_quiz_questions))
        .merge(
            Router::new()
                .route("/save-result", post(quiz::save_quiz_result))
                .layer(auth.clone()),
        );

    let streak_routes = Router::new()
        .route("/", get(streak::get_streak))
        .layer(auth);

    Router::new()
        .nest("/api/exam", exam_routes)
        .nest("/api/quiz", quiz_routes)
        .nest("/api/streak", streak_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
