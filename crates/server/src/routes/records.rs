//! Handlers for `/<route>` and `/<route>/:id`.
//!
//! Bodies are form-encoded string maps; typing happens inside the storage
//! backend. Every returned record carries an `_href` pointing back at itself.

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Form, Json,
};
use serde_json::json;

use common::types::OperationResult;
use models::Fields;
use service::pagination::Pagination;

use crate::errors::JsonApiError;
use crate::metrics;
use crate::state::AppState;

/// Absolute link to a record, built from the request's `Host` header.
fn href(headers: &HeaderMap, route: &str, id: &str) -> String {
    let host = headers
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("localhost");
    format!("http://{host}/{route}/{id}")
}

fn invalid_id(id: &str) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "Invalid id": id }))).into_response()
}

fn counted(count: u64, verb: &str, href: Option<String>) -> Response {
    let status = if count == 0 { StatusCode::NOT_FOUND } else { StatusCode::OK };
    let mut body = OperationResult::counted(count, verb);
    if let Some(href) = href {
        body = body.with_href(href);
    }
    (status, Json(body)).into_response()
}

pub async fn search(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(mut params): Query<Fields>,
) -> Result<Response, JsonApiError> {
    metrics::observe("search");
    state.schema.check_params(&params)?;
    let (skip, limit) = Pagination::take_from(&mut params)?.normalize();

    let route = &state.schema.route;
    let found = state
        .storage
        .search(params, &state.schema.sort_by, skip, limit)
        .await?
        .into_iter()
        .map(|rec| {
            let link = href(&headers, route, &rec.id);
            rec.with_href(link)
        })
        .collect::<Vec<_>>();
    Ok(Json(found).into_response())
}

pub async fn create(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(fields): Form<Fields>,
) -> Result<Response, JsonApiError> {
    metrics::observe("create");
    state.schema.check_fields(&fields)?;
    state.schema.check_required(&fields)?;

    let id = state.storage.create(fields).await?;
    let body = OperationResult {
        result: "Object Created".to_string(),
        href: Some(href(&headers, &state.schema.route, &id)),
        id: Some(id),
    };
    Ok((StatusCode::CREATED, Json(body)).into_response())
}

pub async fn get_one(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Response, JsonApiError> {
    metrics::observe("get");
    if !state.storage.valid_id(&id) {
        return Ok(invalid_id(&id));
    }
    match state.storage.get(&id).await? {
        Some(rec) => {
            let link = href(&headers, &state.schema.route, &rec.id);
            Ok(Json(rec.with_href(link)).into_response())
        }
        None => Ok((StatusCode::NOT_FOUND, Json(json!({}))).into_response()),
    }
}

pub async fn replace(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Form(fields): Form<Fields>,
) -> Result<Response, JsonApiError> {
    metrics::observe("replace");
    if !state.storage.valid_id(&id) {
        return Ok(invalid_id(&id));
    }
    state.schema.check_fields(&fields)?;
    state.schema.check_required(&fields)?;

    let count = state.storage.replace(&id, fields).await?;
    Ok(counted(count, "replaced", Some(href(&headers, &state.schema.route, &id))))
}

pub async fn update(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Form(fields): Form<Fields>,
) -> Result<Response, JsonApiError> {
    metrics::observe("update");
    if !state.storage.valid_id(&id) {
        return Ok(invalid_id(&id));
    }
    state.schema.check_fields(&fields)?;

    let count = state.storage.update(&id, fields).await?;
    Ok(counted(count, "updated", Some(href(&headers, &state.schema.route, &id))))
}

pub async fn delete(State(state): State<AppState>, Path(id): Path<String>) -> Result<Response, JsonApiError> {
    metrics::observe("delete");
    if !state.storage.valid_id(&id) {
        return Ok(invalid_id(&id));
    }
    let count = state.storage.delete(&id).await?;
    Ok(counted(count, "deleted", None))
}
