//! In-memory stand-in for the SonarQube user-group admin API.
//!
//! Implements the four `/api/user_groups/*` endpoints with SonarQube's
//! form-encoded inputs and `{"errors":[{"msg":..}]}` error payloads, behind
//! HTTP basic authentication with the token as username and an empty
//! password. The reserved token [`FORBIDDEN_TOKEN`] authenticates but is
//! denied every action with a 403, so clients can exercise their privilege
//! handling end to end.

use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    routing::{get, post},
    Form, Json, Router,
};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

#[derive(Clone, Debug, Serialize)]
pub struct UserGroup {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

pub type Db = Arc<RwLock<HashMap<String, UserGroup>>>;

/// Token that passes authentication but is denied every action.
pub const FORBIDDEN_TOKEN: &str = "forbidden";

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(HashMap::new()));
    Router::new()
        .route("/api/user_groups/search", get(search_groups))
        .route("/api/user_groups/create", post(create_group))
        .route("/api/user_groups/update", post(update_group))
        .route("/api/user_groups/delete", post(delete_group))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

type ApiError = (StatusCode, Json<Value>);

fn api_error(status: StatusCode, msg: impl Into<String>) -> ApiError {
    (status, Json(json!({ "errors": [{ "msg": msg.into() }] })))
}

/// Validate `Authorization: Basic <base64(token:)>` and extract the token
/// from the username slot.
fn authenticate(headers: &HeaderMap) -> Result<(), ApiError> {
    let unauthorized = || api_error(StatusCode::UNAUTHORIZED, "Authentication required");

    let value = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(unauthorized)?;
    let encoded = value.strip_prefix("Basic ").ok_or_else(unauthorized)?;
    let decoded = STANDARD.decode(encoded).map_err(|_| unauthorized())?;
    let decoded = String::from_utf8(decoded).map_err(|_| unauthorized())?;
    let token = decoded.split(':').next().unwrap_or_default();

    if token.is_empty() {
        return Err(unauthorized());
    }
    if token == FORBIDDEN_TOKEN {
        return Err(api_error(StatusCode::FORBIDDEN, "Insufficient privileges"));
    }
    Ok(())
}

#[derive(Deserialize)]
struct SearchParams {
    q: Option<String>,
}

async fn search_groups(
    State(db): State<Db>,
    headers: HeaderMap,
    Query(params): Query<SearchParams>,
) -> Result<Json<Value>, ApiError> {
    authenticate(&headers)?;

    let needle = params.q.unwrap_or_default().to_lowercase();
    let groups = db.read().await;
    let mut matched: Vec<UserGroup> = groups
        .values()
        .filter(|g| g.name.to_lowercase().contains(&needle))
        .cloned()
        .collect();
    matched.sort_by(|a, b| a.name.cmp(&b.name));

    Ok(Json(json!({
        "paging": { "pageIndex": 1, "pageSize": 100, "total": matched.len() },
        "groups": matched,
    })))
}

#[derive(Deserialize)]
struct CreateParams {
    name: String,
    description: Option<String>,
}

async fn create_group(
    State(db): State<Db>,
    headers: HeaderMap,
    Form(params): Form<CreateParams>,
) -> Result<Json<Value>, ApiError> {
    authenticate(&headers)?;

    let mut groups = db.write().await;
    if groups.values().any(|g| g.name == params.name) {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            format!("Group '{}' already exists", params.name),
        ));
    }
    let group = UserGroup {
        id: Uuid::new_v4().to_string(),
        name: params.name,
        description: params.description,
    };
    groups.insert(group.id.clone(), group.clone());
    Ok(Json(json!({ "group": group })))
}

#[derive(Deserialize)]
struct UpdateParams {
    id: String,
    name: String,
}

async fn update_group(
    State(db): State<Db>,
    headers: HeaderMap,
    Form(params): Form<UpdateParams>,
) -> Result<Json<Value>, ApiError> {
    authenticate(&headers)?;

    let mut groups = db.write().await;
    if params.name.is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "Name cannot be empty"));
    }
    if groups
        .values()
        .any(|g| g.name == params.name && g.id != params.id)
    {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            format!("Group '{}' already exists", params.name),
        ));
    }
    let group = groups.get_mut(&params.id).ok_or_else(|| {
        api_error(
            StatusCode::NOT_FOUND,
            format!("Group with id '{}' not found", params.id),
        )
    })?;
    group.name = params.name;
    Ok(Json(json!({ "group": group.clone() })))
}

#[derive(Deserialize)]
struct DeleteParams {
    id: String,
}

async fn delete_group(
    State(db): State<Db>,
    headers: HeaderMap,
    Form(params): Form<DeleteParams>,
) -> Result<StatusCode, ApiError> {
    authenticate(&headers)?;

    let mut groups = db.write().await;
    groups.remove(&params.id).ok_or_else(|| {
        api_error(
            StatusCode::NOT_FOUND,
            format!("Group with id '{}' not found", params.id),
        )
    })?;
    // SonarQube answers deletes with an empty body.
    Ok(StatusCode::OK)
}
