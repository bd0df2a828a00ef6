pub mod auth;
pub mod error;
pub mod routes;
pub mod state;

use axum::routing::{get, post, put};
use axum::{middleware, Router};
use sqlx::PgPool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Build the axum Router with all API routes and middleware.
/// Used by `serve()` and available for integration testing.
pub fn build_router(pool: PgPool) -> Router {
    let app_state = state::AppState::new(pool);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Plans (auto-provisioned on read)
        .route("/api/rrgt/mine", get(routes::plans::list_my_plans))
        .route(
            "/api/rrgt/plans/{plan_id}/rabbit",
            put(routes::plans::move_rabbit),
        )
        .route(
            "/api/rrgt/plans/{plan_id}/subtasks",
            put(routes::plans::upsert_subtask),
        )
        // God-view (role-gated)
        .route(
            "/api/rrgt/{team_member_id}",
            get(routes::plans::get_member_plans),
        )
        // Dial
        .route(
            "/api/dial/mine",
            get(routes::dial::get_my_dial).put(routes::dial::put_my_dial),
        )
        // Items
        .route("/api/tasks/{task_id}/items", post(routes::items::create_item))
        .route(
            "/api/items/{item_id}",
            put(routes::items::update_item).delete(routes::items::delete_item),
        )
        .layer(middleware::from_fn(auth::identity_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state)
}

/// Start the RRGT API server.
pub async fn serve(pool: PgPool, host: &str, port: u16) -> anyhow::Result<()> {
    let app = build_router(pool);

    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("RRGT API server listening on http://{addr}");

    axum::serve(listener, app).await?;
    Ok(())
}
