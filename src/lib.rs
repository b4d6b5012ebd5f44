pub mod db;
pub mod error;
pub mod excel;
pub mod handlers;
pub mod models;
pub mod store;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};

pub fn router(db: db::Db) -> Router {
    let state = handlers::AppState { db };

    // CORS: allow all
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health))
        .route(
            "/api/contacts",
            get(handlers::list_contacts).post(handlers::create_contact),
        )
        .route("/api/contacts/import", post(handlers::import_contacts))
        .route("/api/contacts/import/excel", post(handlers::import_excel))
        .route(
            "/api/contacts/:id",
            get(handlers::get_contact)
                .put(handlers::update_contact)
                .delete(handlers::delete_contact),
        )
        .fallback(handlers::fallback)
        .layer(cors)
        .with_state(state)
}
