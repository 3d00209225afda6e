//! In-memory stand-in for the provider's `ip/...` endpoints.
//!
//! Blocks are keyed by their decoded CIDR (`1.2.3.0/24`); axum decodes the
//! `%2F` in the path segment before it reaches a handler.

use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::info;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SpamState {
    BlockedForSpam,
    Unblocked,
    Unblocking,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockView {
    pub ip: String,
    pub description: Option<String>,
    pub routed_to: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reverse {
    pub ip_reverse: String,
    pub reverse: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpamIp {
    pub ip_spamming: String,
    pub state: SpamState,
    pub number_of_spams: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArpBlockedIp {
    pub ip_blocked: String,
    pub state: String,
}

#[derive(Clone, Debug)]
pub struct Block {
    pub view: BlockView,
    pub reverses: BTreeMap<String, Reverse>,
    pub spam: BTreeMap<String, SpamIp>,
    pub arp: BTreeMap<String, ArpBlockedIp>,
}

impl Block {
    fn empty(ip: &str, description: Option<&str>, routed_to: Option<&str>) -> Self {
        Self {
            view: BlockView {
                ip: ip.to_string(),
                description: description.map(str::to_string),
                routed_to: routed_to.map(str::to_string),
            },
            reverses: BTreeMap::new(),
            spam: BTreeMap::new(),
            arp: BTreeMap::new(),
        }
    }
}

#[derive(Deserialize)]
pub struct SetDescription {
    pub description: String,
}

#[derive(Deserialize)]
pub struct MoveTo {
    pub to: String,
}

#[derive(Deserialize)]
pub struct SpamFilter {
    pub state: SpamState,
}

#[derive(Deserialize)]
pub struct StatsRange {
    pub from: String,
    pub to: String,
}

pub type Db = Arc<RwLock<HashMap<String, Block>>>;

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<Value>)>;

/// The blocks every fresh `app()` starts with.
pub fn seed() -> HashMap<String, Block> {
    let mut v4 = Block::empty("1.2.3.0/24", Some("prod"), Some("ns1.example.net"));
    v4.reverses.insert(
        "1.2.3.4".to_string(),
        Reverse {
            ip_reverse: "1.2.3.4".to_string(),
            reverse: "host.example.com.".to_string(),
        },
    );
    v4.spam.insert(
        "1.2.3.5".to_string(),
        SpamIp {
            ip_spamming: "1.2.3.5".to_string(),
            state: SpamState::BlockedForSpam,
            number_of_spams: 42,
        },
    );
    v4.spam.insert(
        "1.2.3.6".to_string(),
        SpamIp {
            ip_spamming: "1.2.3.6".to_string(),
            state: SpamState::Unblocked,
            number_of_spams: 3,
        },
    );
    v4.arp.insert(
        "1.2.3.7".to_string(),
        ArpBlockedIp {
            ip_blocked: "1.2.3.7".to_string(),
            state: "blocked".to_string(),
        },
    );

    let v6 = Block::empty("2001:41d0::/48", None, None);

    HashMap::from([
        (v4.view.ip.clone(), v4),
        (v6.view.ip.clone(), v6),
    ])
}

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(seed()));
    Router::new()
        .route("/ip/{block}", get(get_block).put(set_block))
        .route("/ip/{block}/arp", get(list_arp))
        .route("/ip/{block}/arp/{ip}", get(get_arp))
        .route("/ip/{block}/reverse/", get(list_reverse))
        .route("/ip/{block}/reverse", post(create_reverse))
        .route("/ip/{block}/reverse/{ip}", get(get_reverse).delete(delete_reverse))
        .route("/ip/{block}/spam/", get(list_spam))
        .route("/ip/{block}/spam/{ip}", get(get_spam))
        .route("/ip/{block}/spam/{ip}/stats", get(spam_stats))
        .route("/ip/{block}/spam/{ip}/unblock", post(unblock_spam))
        .route("/ip/{block}/move", post(move_block))
        .route("/ip/{block}/park", post(park_block))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

fn missing(kind: &str, id: &str) -> (StatusCode, Json<Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "message": format!("The requested object ({kind} = {id}) does not exist") })),
    )
}

async fn get_block(State(db): State<Db>, Path(block): Path<String>) -> ApiResult<BlockView> {
    let blocks = db.read().await;
    let found = blocks.get(&block).ok_or_else(|| missing("ip", &block))?;
    Ok(Json(found.view.clone()))
}

async fn set_block(
    State(db): State<Db>,
    Path(block): Path<String>,
    Json(input): Json<SetDescription>,
) -> ApiResult<Value> {
    let mut blocks = db.write().await;
    let found = blocks.get_mut(&block).ok_or_else(|| missing("ip", &block))?;
    info!(%block, description = %input.description, "description updated");
    found.view.description = Some(input.description);
    Ok(Json(Value::Null))
}

async fn list_arp(State(db): State<Db>, Path(block): Path<String>) -> ApiResult<Vec<String>> {
    let blocks = db.read().await;
    let found = blocks.get(&block).ok_or_else(|| missing("ip", &block))?;
    Ok(Json(found.arp.keys().cloned().collect()))
}

async fn get_arp(
    State(db): State<Db>,
    Path((block, ip)): Path<(String, String)>,
) -> ApiResult<ArpBlockedIp> {
    let blocks = db.read().await;
    let found = blocks.get(&block).ok_or_else(|| missing("ip", &block))?;
    found.arp.get(&ip).cloned().map(Json).ok_or_else(|| missing("ipBlocked", &ip))
}

async fn list_reverse(State(db): State<Db>, Path(block): Path<String>) -> ApiResult<Vec<String>> {
    let blocks = db.read().await;
    let found = blocks.get(&block).ok_or_else(|| missing("ip", &block))?;
    Ok(Json(found.reverses.keys().cloned().collect()))
}

async fn get_reverse(
    State(db): State<Db>,
    Path((block, ip)): Path<(String, String)>,
) -> ApiResult<Reverse> {
    let blocks = db.read().await;
    let found = blocks.get(&block).ok_or_else(|| missing("ip", &block))?;
    found.reverses.get(&ip).cloned().map(Json).ok_or_else(|| missing("ipReverse", &ip))
}

async fn create_reverse(
    State(db): State<Db>,
    Path(block): Path<String>,
    Json(input): Json<Reverse>,
) -> ApiResult<Reverse> {
    let mut blocks = db.write().await;
    let found = blocks.get_mut(&block).ok_or_else(|| missing("ip", &block))?;
    info!(%block, ip = %input.ip_reverse, reverse = %input.reverse, "reverse set");
    found.reverses.insert(input.ip_reverse.clone(), input.clone());
    Ok(Json(input))
}

async fn delete_reverse(
    State(db): State<Db>,
    Path((block, ip)): Path<(String, String)>,
) -> ApiResult<Value> {
    let mut blocks = db.write().await;
    let found = blocks.get_mut(&block).ok_or_else(|| missing("ip", &block))?;
    found.reverses.remove(&ip).ok_or_else(|| missing("ipReverse", &ip))?;
    Ok(Json(Value::Null))
}

async fn list_spam(
    State(db): State<Db>,
    Path(block): Path<String>,
    Query(filter): Query<SpamFilter>,
) -> ApiResult<Vec<String>> {
    let blocks = db.read().await;
    let found = blocks.get(&block).ok_or_else(|| missing("ip", &block))?;
    Ok(Json(
        found
            .spam
            .values()
            .filter(|entry| entry.state == filter.state)
            .map(|entry| entry.ip_spamming.clone())
            .collect(),
    ))
}

async fn get_spam(
    State(db): State<Db>,
    Path((block, ip)): Path<(String, String)>,
) -> ApiResult<SpamIp> {
    let blocks = db.read().await;
    let found = blocks.get(&block).ok_or_else(|| missing("ip", &block))?;
    found.spam.get(&ip).cloned().map(Json).ok_or_else(|| missing("ipSpamming", &ip))
}

async fn spam_stats(
    State(db): State<Db>,
    Path((block, ip)): Path<(String, String)>,
    Query(range): Query<StatsRange>,
) -> ApiResult<Value> {
    let blocks = db.read().await;
    let found = blocks.get(&block).ok_or_else(|| missing("ip", &block))?;
    let entry = found.spam.get(&ip).ok_or_else(|| missing("ipSpamming", &ip))?;
    Ok(Json(json!([{
        "from": range.from,
        "to": range.to,
        "total": entry.number_of_spams,
    }])))
}

async fn unblock_spam(
    State(db): State<Db>,
    Path((block, ip)): Path<(String, String)>,
) -> ApiResult<SpamIp> {
    let mut blocks = db.write().await;
    let found = blocks.get_mut(&block).ok_or_else(|| missing("ip", &block))?;
    let entry = found.spam.get_mut(&ip).ok_or_else(|| missing("ipSpamming", &ip))?;
    if entry.state != SpamState::BlockedForSpam {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({ "message": format!("{ip} is not blocked for spam") })),
        ));
    }
    info!(%block, %ip, "unblocking");
    entry.state = SpamState::Unblocking;
    Ok(Json(entry.clone()))
}

async fn move_block(
    State(db): State<Db>,
    Path(block): Path<String>,
    Json(input): Json<MoveTo>,
) -> ApiResult<Value> {
    let mut blocks = db.write().await;
    let found = blocks.get_mut(&block).ok_or_else(|| missing("ip", &block))?;
    info!(%block, to = %input.to, "moving block");
    found.view.routed_to = Some(input.to.clone());
    Ok(Json(json!({ "action": "move", "status": "pending", "to": input.to })))
}

async fn park_block(State(db): State<Db>, Path(block): Path<String>) -> ApiResult<Value> {
    let mut blocks = db.write().await;
    let found = blocks.get_mut(&block).ok_or_else(|| missing("ip", &block))?;
    info!(%block, "parking block");
    found.view.routed_to = None;
    Ok(Json(json!({ "action": "park", "status": "pending" })))
}
