//! HTTP routes.
//!
//! | Method | Path                   | Handler                     |
//! |--------|------------------------|-----------------------------|
//! | GET    | `/acl/{id}`            | current panels              |
//! | POST   | `/acl/{id}`            | apply a mutation            |
//! | POST   | `/acl/{id}/pathcount`  | descendants a mutation hits |
//! | GET    | `/acl/events`          | SSE change stream           |
//! | GET    | `/audit`               | audit history               |
//! | GET    | `/permissions`         | permission catalog          |
//! | GET    | `/principals?q=`       | principal search            |
//! | GET    | `/health`              | liveness                    |

use axum::Json;
use axum::Router;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::routing::get;
use fabryk_acl::{AclPanels, AclRequest, AuditEntry, AuditId, PrincipalNames};
use fabryk_core::ResourceId;
use serde::{Deserialize, Serialize};

use crate::caller::CurrentCaller;
use crate::error::{Error, Result};
use crate::sse::events;
use crate::state::AppState;

/// Routes that act on behalf of a caller (wrap these in the auth layer).
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/acl/events", get(events))
        .route("/acl/{id}", get(show_acl).post(edit_acl))
        .route("/acl/{id}/pathcount", axum::routing::post(pathcount))
        .route("/audit", get(audit))
        .route("/permissions", get(permissions))
        .route("/principals", get(principals))
}

/// Unauthenticated routes.
pub fn public_routes() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

/// Resource id from a path segment or query value; blank ids are a
/// malformed request.
pub(crate) fn parse_id(raw: &str) -> Result<ResourceId> {
    ResourceId::parse(raw).map_err(|e| Error::bad_request(e.to_string()))
}

fn parse_body(body: &Bytes) -> Result<serde_json::Value> {
    serde_json::from_slice(body)
        .map_err(|e| Error::from(fabryk_acl::Error::bad_request(format!("invalid JSON: {e}"))))
}

async fn show_acl(
    State(state): State<AppState>,
    CurrentCaller(caller): CurrentCaller,
    Path(id): Path<String>,
) -> Result<Json<AclPanels>> {
    let resource = parse_id(&id)?;
    Ok(Json(state.session.view(&caller, &resource).await?))
}

async fn edit_acl(
    State(state): State<AppState>,
    CurrentCaller(caller): CurrentCaller,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<AclPanels>> {
    let resource = parse_id(&id)?;
    let request = parse_body(&body)?;
    let outcome = state.session.handle(&caller, &resource, request).await?;
    Ok(Json(outcome.panels))
}

#[derive(Debug, Serialize, Deserialize)]
struct PathCount {
    pathcount: usize,
}

async fn pathcount(
    State(state): State<AppState>,
    CurrentCaller(caller): CurrentCaller,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<PathCount>> {
    let resource = parse_id(&id)?;
    let request = AclRequest::from_json(parse_body(&body)?)?;
    let pathcount = state.session.pathcount(&caller, &resource, &request).await?;
    Ok(Json(PathCount { pathcount }))
}

#[derive(Debug, Serialize)]
struct AuditRecord {
    id: String,
    #[serde(flatten)]
    entry: AuditEntry,
}

/// Audit query: `generation` and `index` form the cursor (both or
/// neither); `resource` may repeat.
async fn audit(
    State(state): State<AppState>,
    CurrentCaller(caller): CurrentCaller,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<Vec<AuditRecord>>> {
    let mut generation = None;
    let mut index = None;
    let mut resources = Vec::new();
    for (key, value) in pairs {
        match key.as_str() {
            "generation" => {
                generation = Some(value.parse::<u64>().map_err(|_| {
                    Error::bad_request(format!("generation must be an integer, got '{value}'"))
                })?)
            }
            "index" => {
                index = Some(value.parse::<usize>().map_err(|_| {
                    Error::bad_request(format!("index must be an integer, got '{value}'"))
                })?)
            }
            "resource" => resources.push(parse_id(&value)?),
            _ => {}
        }
    }
    let cursor = match (generation, index) {
        (Some(g), Some(i)) => Some(AuditId::new(g, i)),
        (None, None) => None,
        _ => return Err(Error::bad_request("generation and index must be given together")),
    };

    let mut records = Vec::new();
    let mut allowed: Vec<(ResourceId, bool)> = Vec::new();
    for (id, entry) in state.service().audit().newer(cursor, &resources) {
        let visible = match allowed.iter().find(|(r, _)| r == &entry.oid) {
            Some((_, ok)) => *ok,
            None => {
                let ok = state.session.authorize(&caller, &entry.oid).await.is_ok();
                allowed.push((entry.oid.clone(), ok));
                ok
            }
        };
        if visible {
            records.push(AuditRecord {
                id: id.to_string(),
                entry,
            });
        }
    }
    Ok(Json(records))
}

async fn permissions(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(state.catalog.permissions().into_iter().collect())
}

#[derive(Debug, Deserialize)]
struct PrincipalQuery {
    #[serde(default)]
    q: String,
}

async fn principals(
    State(state): State<AppState>,
    Query(query): Query<PrincipalQuery>,
) -> Json<PrincipalNames> {
    let ids = state.directory.search(&query.q).await;
    Json(state.directory.display_names(&ids).await)
}

async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "resources": state.service().resources().len(),
        "subscribers": state.service().notifier().subscriber_count(),
    }))
}
