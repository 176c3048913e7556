use std::{
    collections::{BTreeMap, HashMap},
    sync::{
        atomic::{AtomicI64, Ordering},
        Arc,
    },
};

use axum::{
    body::Bytes,
    extract::{Multipart, Path, Query, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{any, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

/// Quota advertised in `x-ratelimit-limit`.
pub const RATE_LIMIT: i64 = 60;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Site {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(rename = "shortName")]
    pub short_name: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Item {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_cid")]
    pub collection_id: String,
    pub name: String,
    pub slug: String,
}

#[derive(Clone, Default)]
pub struct AppState {
    items: Arc<RwLock<HashMap<String, Vec<Item>>>>,
    used: Arc<AtomicI64>,
}

#[derive(Deserialize)]
pub struct Pagination {
    pub page: Option<usize>,
    pub per_page: Option<usize>,
}

pub fn app() -> Router {
    Router::new()
        .route("/info", get(info))
        .route("/sites", get(list_sites))
        .route("/collections/{cid}/items", get(list_items).post(create_item))
        .route("/collections/{cid}/items/{id}", get(get_item).delete(delete_item))
        .route("/assets", post(upload_asset))
        .route("/echo", any(echo))
        .with_state(AppState::default())
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

/// Respond with the rate-limit headers, charging one request to the quota.
fn metered(state: &AppState, status: StatusCode, body: Value) -> Response {
    let used = state.used.fetch_add(1, Ordering::SeqCst) + 1;
    let remaining = (RATE_LIMIT - used).max(0);
    (
        status,
        [
            ("x-ratelimit-limit", RATE_LIMIT.to_string()),
            ("x-ratelimit-remaining", remaining.to_string()),
        ],
        Json(body),
    )
        .into_response()
}

fn api_error(message: &str, code: u16) -> Value {
    json!({ "errors": [{ "message": message, "code": code }] })
}

fn not_found(state: &AppState) -> Response {
    metered(state, StatusCode::NOT_FOUND, api_error("Not Found", 404))
}

fn slugify(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
}

/// Unmetered: answers without rate-limit headers.
async fn info() -> Json<Value> {
    Json(json!({ "data": { "application": "mock-server", "rateLimit": RATE_LIMIT } }))
}

/// Answers with a bare array rather than an envelope.
async fn list_sites(State(state): State<AppState>) -> Response {
    let sites = vec![Site {
        id: "580e63e98c9a982ac9b8b741".to_string(),
        name: "Demo Site".to_string(),
        short_name: "demo-site".to_string(),
    }];
    metered(&state, StatusCode::OK, json!(sites))
}

async fn list_items(
    State(state): State<AppState>,
    Path(cid): Path<String>,
    Query(pagination): Query<Pagination>,
) -> Response {
    let page = pagination.page.unwrap_or(1).max(1);
    let per_page = pagination.per_page.unwrap_or(100);

    let body = {
        let items = state.items.read().await;
        let all = items.get(&cid).map(Vec::as_slice).unwrap_or_default();
        let slice: Vec<&Item> = all.iter().skip((page - 1) * per_page).take(per_page).collect();
        json!({
            "data": {
                "items": slice,
                "count": slice.len(),
                "total": all.len(),
                "page": page,
                "per_page": per_page,
            }
        })
    };
    metered(&state, StatusCode::OK, body)
}

async fn create_item(
    State(state): State<AppState>,
    Path(cid): Path<String>,
    body: Bytes,
) -> Response {
    let Ok(input) = serde_json::from_slice::<Value>(&body) else {
        return metered(&state, StatusCode::BAD_REQUEST, api_error("Bad Request", 400));
    };
    let Some(name) = input["fields"]["name"].as_str() else {
        return metered(&state, StatusCode::BAD_REQUEST, api_error("Validation Failure", 400));
    };

    let item = Item {
        id: Uuid::new_v4().simple().to_string(),
        collection_id: cid.clone(),
        name: name.to_string(),
        slug: input["fields"]["slug"]
            .as_str()
            .map(str::to_string)
            .unwrap_or_else(|| slugify(name)),
    };
    tracing::debug!(collection = %cid, id = %item.id, "created item");
    state.items.write().await.entry(cid).or_default().push(item.clone());
    metered(&state, StatusCode::OK, json!({ "data": item }))
}

async fn get_item(
    State(state): State<AppState>,
    Path((cid, id)): Path<(String, String)>,
) -> Response {
    let found = state
        .items
        .read()
        .await
        .get(&cid)
        .and_then(|items| items.iter().find(|item| item.id == id).cloned());
    match found {
        Some(item) => metered(&state, StatusCode::OK, json!({ "data": item })),
        None => not_found(&state),
    }
}

async fn delete_item(
    State(state): State<AppState>,
    Path((cid, id)): Path<(String, String)>,
) -> Response {
    let removed = {
        let mut items = state.items.write().await;
        match items.get_mut(&cid) {
            Some(list) => {
                let before = list.len();
                list.retain(|item| item.id != id);
                before - list.len()
            }
            None => 0,
        }
    };
    if removed == 0 {
        return not_found(&state);
    }
    metered(&state, StatusCode::OK, json!({ "data": { "deleted": removed } }))
}

/// Reflects the method and the JSON body (or `null`) back inside `data`.
async fn echo(State(state): State<AppState>, method: Method, body: Bytes) -> Response {
    let body = serde_json::from_slice::<Value>(&body).unwrap_or(Value::Null);
    metered(
        &state,
        StatusCode::OK,
        json!({ "data": { "method": method.as_str(), "body": body } }),
    )
}

async fn upload_asset(State(state): State<AppState>, mut multipart: Multipart) -> Response {
    let mut fields = BTreeMap::new();
    let mut file = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                return metered(&state, StatusCode::BAD_REQUEST, api_error(&e.to_string(), 400))
            }
        };
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let data = match field.bytes().await {
            Ok(data) => data,
            Err(e) => {
                return metered(&state, StatusCode::BAD_REQUEST, api_error(&e.to_string(), 400))
            }
        };

        match file_name {
            Some(file_name) => file = Some((name, file_name, content_type, data.len())),
            None => {
                fields.insert(name, String::from_utf8_lossy(&data).into_owned());
            }
        }
    }

    let Some((field, file_name, content_type, size)) = file else {
        return metered(&state, StatusCode::BAD_REQUEST, api_error("Missing file", 400));
    };
    tracing::debug!(%file_name, size, "received asset");
    metered(
        &state,
        StatusCode::OK,
        json!({
            "data": {
                "field": field,
                "fileName": file_name,
                "contentType": content_type,
                "size": size,
                "fields": fields,
            }
        }),
    )
}
