use axum::{
    extract::{Multipart, Path, Query, State},
    http::{Method, StatusCode, Uri},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::db::{now_timestamp, Db};
use crate::error::{AppError, AppResult};
use crate::models::ContactInput;
use crate::{excel, store};

pub const SERVICE_NAME: &str = "Contact Management API";

#[derive(Clone)]
pub struct AppState {
    pub db: Db,
}

/// Store calls are blocking rusqlite operations, so they run on the blocking
/// pool; the handler suspends until each completes.
async fn run_blocking<T, F>(f: F) -> AppResult<T>
where
    F: FnOnce() -> AppResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await?
}

// ────────────────────────────────────────────────────────────────────────────
// Contacts
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub search: Option<String>,
    pub bookmarked: Option<String>,
}

pub async fn list_contacts(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> AppResult<Json<Value>> {
    let filter = store::ListFilter {
        page: params.page.unwrap_or(1),
        limit: params.limit.unwrap_or(100),
        search: params.search.unwrap_or_default(),
        bookmarked_only: params.bookmarked.as_deref() == Some("true"),
    };

    let db = state.db.clone();
    let (contacts, pagination) = run_blocking(move || store::list_contacts(&db, &filter)).await?;

    Ok(Json(json!({
        "success": true,
        "data": contacts,
        "pagination": pagination,
        "timestamp": now_timestamp(),
    })))
}

pub async fn get_contact(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Value>> {
    let db = state.db.clone();
    let contact = run_blocking(move || store::get_contact(&db, &id)).await?;

    Ok(Json(json!({
        "success": true,
        "data": contact,
    })))
}

pub async fn create_contact(
    State(state): State<AppState>,
    Json(input): Json<ContactInput>,
) -> AppResult<impl IntoResponse> {
    let db = state.db.clone();
    let (id, name) = run_blocking(move || store::create_contact(&db, &input)).await?;
    info!("contact created: {name} ({id})");

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "contact created",
            "data": { "id": id, "name": name },
        })),
    ))
}

pub async fn update_contact(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<ContactInput>,
) -> AppResult<Json<Value>> {
    let db = state.db.clone();
    let id_for_store = id.clone();
    let name = run_blocking(move || store::update_contact(&db, &id_for_store, &input)).await?;
    info!("contact updated: {name} ({id})");

    Ok(Json(json!({
        "success": true,
        "message": "contact updated",
        "data": { "id": id, "name": name },
    })))
}

pub async fn delete_contact(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Value>> {
    let db = state.db.clone();
    let id_for_store = id.clone();
    let name = run_blocking(move || store::delete_contact(&db, &id_for_store)).await?;
    info!("contact deleted: {name} ({id})");

    Ok(Json(json!({
        "success": true,
        "message": format!("contact \"{name}\" deleted"),
    })))
}

// ────────────────────────────────────────────────────────────────────────────
// Imports
// ────────────────────────────────────────────────────────────────────────────

pub async fn import_contacts(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> AppResult<Json<Value>> {
    let rows = body.get("contacts").cloned().unwrap_or(Value::Null);
    let rows: Vec<ContactInput> = serde_json::from_value(rows)
        .map_err(|_| AppError::Validation("contacts must be a non-empty array".into()))?;

    let db = state.db.clone();
    let report = run_blocking(move || store::import_contacts(&db, &rows)).await?;
    info!(
        "import finished: {} ok, {} failed",
        report.success, report.failed
    );

    Ok(Json(json!({
        "success": true,
        "message": "import finished",
        "data": report,
    })))
}

pub async fn import_excel(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<Json<Value>> {
    let mut file: Option<Vec<u8>> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("multipart error: {e}")))?
    {
        if field.name() == Some("file") {
            let data = field
                .bytes()
                .await
                .map_err(|e| AppError::Validation(format!("read file error: {e}")))?;
            file = Some(data.to_vec());
        }
    }
    let bytes = file.ok_or_else(|| AppError::Validation("file field is required".into()))?;

    let db = state.db.clone();
    let report = run_blocking(move || {
        let rows = excel::parse_workbook(&bytes)?;
        store::import_contacts(&db, &rows)
    })
    .await?;
    info!(
        "excel import finished: {} ok, {} failed",
        report.success, report.failed
    );

    Ok(Json(json!({
        "success": true,
        "message": "excel import finished",
        "data": report,
    })))
}

// ────────────────────────────────────────────────────────────────────────────
// Service endpoints
// ────────────────────────────────────────────────────────────────────────────

pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": now_timestamp(),
        "service": SERVICE_NAME,
    }))
}

pub async fn index() -> Json<Value> {
    Json(json!({
        "message": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "contacts": {
                "GET_all": "/api/contacts",
                "GET_one": "/api/contacts/:id",
                "POST": "/api/contacts",
                "PUT": "/api/contacts/:id",
                "DELETE": "/api/contacts/:id",
                "IMPORT": "/api/contacts/import",
                "IMPORT_EXCEL": "/api/contacts/import/excel",
            },
            "health": "/health",
        },
    }))
}

pub async fn fallback(method: Method, uri: Uri) -> (StatusCode, Json<Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": "API endpoint not found",
            "path": uri.path(),
            "method": method.as_str(),
        })),
    )
}
