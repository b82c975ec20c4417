//! Throwaway HTTP servers standing in for the content gateway and the log
//! indexer.
#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use num_bigint::BigUint;
use serde_json::{json, Value};

use royalty_claims_core::{encode_claim_event, to_hex, ManifestRow, SimpleMerkleTree};
use royalty_claims_server::config::ClaimSource;

pub const WALLET: &str = "0x1111111111111111111111111111111111111111";
pub const OTHER_WALLET: &str = "0x2222222222222222222222222222222222222222";
pub const CONTRACT: &str = "0x3333333333333333333333333333333333333333";
pub const EVENT_TOPIC: &str = "0x4444444444444444444444444444444444444444444444444444444444444444";
pub const CONTENT_ID: &str = "bafymanifest";
pub const ONE_TOKEN: u64 = 1_000_000_000_000_000_000;

pub async fn spawn(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

pub fn address(hex: &str) -> [u8; 20] {
    royalty_claims_core::parse_address(hex).unwrap()
}

/// Manifest: WALLET owns rows 0 (1 token) and 1 (2 tokens), OTHER_WALLET row 2.
pub fn manifest_rows() -> Vec<ManifestRow> {
    vec![
        ManifestRow::new(0, address(WALLET), ONE_TOKEN),
        ManifestRow::new(1, address(WALLET), 2 * ONE_TOKEN),
        ManifestRow::new(2, address(OTHER_WALLET), 5 * ONE_TOKEN),
    ]
}

pub fn manifest_csv(rows: &[ManifestRow]) -> String {
    let mut out = String::from("Index,Address,Amount\n");
    for row in rows {
        out.push_str(&format!("{},{},{}\n", row.index, row.address_hex(), row.amount));
    }
    out
}

pub fn root_of(rows: &[ManifestRow]) -> String {
    to_hex(&SimpleMerkleTree::from_rows(rows).unwrap().root())
}

/// Gateway serving `body` under `/ipfs/{CONTENT_ID}`; everything else is 404.
pub async fn spawn_gateway(body: String) -> String {
    spawn_counting_gateway(body).await.0
}

/// Like [`spawn_gateway`], also counting requests for the manifest.
pub async fn spawn_counting_gateway(body: String) -> (String, Arc<AtomicUsize>) {
    let body = Arc::new(body);
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();
    let router = Router::new().route(
        "/ipfs/{cid}",
        get(move |Path(cid): Path<String>| {
            let body = body.clone();
            let counter = counter.clone();
            async move {
                if cid == CONTENT_ID {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(body.as_str().to_string())
                } else {
                    Err(StatusCode::NOT_FOUND)
                }
            }
        }),
    );
    (spawn(router).await, hits)
}

pub fn manifest_url(gateway: &str) -> String {
    format!("{gateway}/ipfs/{CONTENT_ID}")
}

/// Indexer log record carrying a claim of `index`/`amount` by `claimant`.
pub fn claim_log(block: u64, tx: &str, claimant: &str, index: u64, amount: u64) -> Value {
    let data = encode_claim_event(&address(claimant), index, &BigUint::from(amount));
    json!({
        "block_number": block,
        "transaction_hash": tx,
        "data": to_hex(&data),
        "address": CONTRACT,
        "topic0": EVENT_TOPIC,
    })
}

/// Indexer response page.
pub fn indexer_page(blocks: &[(u64, u64)], logs: Vec<Value>, next_block: Option<u64>) -> Value {
    let blocks: Vec<Value> = blocks
        .iter()
        .map(|(n, ts)| json!({"number": n, "timestamp": format!("0x{ts:x}")}))
        .collect();
    let mut page = json!({ "data": [{ "blocks": blocks, "logs": logs }] });
    if let Some(next) = next_block {
        page["next_block"] = json!(next);
    }
    page
}

#[derive(Clone, Default)]
pub struct MockIndexer {
    /// Response per requested `from_block`; missing entries answer 500.
    pub pages: Arc<HashMap<u64, Value>>,
    pub requests: Arc<Mutex<Vec<Value>>>,
}

impl MockIndexer {
    pub fn new(pages: HashMap<u64, Value>) -> Self {
        Self {
            pages: Arc::new(pages),
            requests: Arc::default(),
        }
    }

    pub fn requested_blocks(&self) -> Vec<u64> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|r| r["from_block"].as_u64().unwrap())
            .collect()
    }

    pub async fn spawn(&self) -> String {
        async fn query(
            State(mock): State<MockIndexer>,
            Json(body): Json<Value>,
        ) -> Result<Json<Value>, StatusCode> {
            mock.requests.lock().unwrap().push(body.clone());
            let from = body["from_block"].as_u64().ok_or(StatusCode::BAD_REQUEST)?;
            mock.pages
                .get(&from)
                .cloned()
                .map(Json)
                .ok_or(StatusCode::INTERNAL_SERVER_ERROR)
        }

        spawn(Router::new().route("/query", post(query)).with_state(self.clone())).await
    }
}

pub fn source(gateway: &str, indexer: &str, merkle_root: &str) -> ClaimSource {
    ClaimSource {
        name: "permian-1".into(),
        manifest_url: manifest_url(gateway),
        content_id: CONTENT_ID.into(),
        merkle_root: merkle_root.into(),
        contract_address: CONTRACT.into(),
        event_topic: EVENT_TOPIC.into(),
        from_block: 100,
        to_block: 300,
        indexer_url: Some(format!("{indexer}/query")),
        decimals: 18,
        transaction_filter: None,
    }
}
