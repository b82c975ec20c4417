//! Integration tests for the claims API.
//!
//! These tests start the real router on a random port, backed by mock gateway
//! and indexer servers, and hit the endpoints with an HTTP client.

mod common;

use std::{
    collections::HashMap,
    sync::atomic::Ordering,
    time::Duration,
};

use serde_json::Value;

use common::*;
use royalty_claims_core::{parse_hash, row_leaf, verify_proof};
use royalty_claims_server::{build_router, build_state};

struct Harness {
    api: String,
    indexer: MockIndexer,
    merkle_root: String,
}

/// API over one source in which WALLET has claimed row 0.
async fn harness() -> Harness {
    let rows = manifest_rows();
    let merkle_root = root_of(&rows);
    let gateway = spawn_gateway(manifest_csv(&rows)).await;
    let indexer = MockIndexer::new(HashMap::from([(
        100,
        indexer_page(
            &[(105, 1_700_000_000)],
            vec![claim_log(105, "0xc1", WALLET, 0, ONE_TOKEN)],
            None,
        ),
    )]));
    let indexer_url = indexer.spawn().await;

    let state = build_state(
        vec![source(&gateway, &indexer_url, &merkle_root)],
        format!("{indexer_url}/query"),
        Duration::from_secs(60),
    );
    let api = spawn(build_router(state)).await;
    Harness {
        api,
        indexer,
        merkle_root,
    }
}

async fn get_json(url: &str) -> (u16, Value) {
    let resp = reqwest::get(url).await.unwrap();
    let status = resp.status().as_u16();
    let body = resp.json().await.unwrap_or(Value::Null);
    (status, body)
}

#[tokio::test]
async fn health_reports_source_count() {
    let h = harness().await;
    let (status, body) = get_json(&format!("{}/api/health", h.api)).await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["sources"], 1);
    assert_eq!(body["cachedPortfolios"], 0);

    get_json(&format!("{}/api/claims/{}", h.api, WALLET)).await;
    let (_, body) = get_json(&format!("{}/api/health", h.api)).await;
    assert_eq!(body["cachedPortfolios"], 1);
}

#[tokio::test]
async fn sources_are_listed_in_camel_case() {
    let h = harness().await;
    let (status, body) = get_json(&format!("{}/api/sources", h.api)).await;
    assert_eq!(status, 200);
    assert_eq!(body[0]["name"], "permian-1");
    assert_eq!(body[0]["merkleRoot"], h.merkle_root.as_str());
    assert_eq!(body[0]["fromBlock"], 100);
    assert_eq!(body[0]["decimals"], 18);
}

#[tokio::test]
async fn portfolio_reconciles_wallet() {
    let h = harness().await;
    let (status, body) = get_json(&format!("{}/api/claims/{}", h.api, WALLET)).await;
    assert_eq!(status, 200);
    assert_eq!(body["ownerAddress"], WALLET);
    assert_eq!(body["totalClaimedAmount"], "1000000000000000000");
    assert_eq!(body["totalUnclaimedAmount"], "2000000000000000000");
    assert_eq!(body["totalEarned"], "3000000000000000000");
    assert_eq!(body["totalEarnedDisplay"], "3.0");

    let source = &body["sources"][0];
    assert_eq!(source["source"], "permian-1");
    assert_eq!(source["status"], "ok");
    assert_eq!(source["integrityVerified"], true);
    assert_eq!(source["claims"][0]["date"], "2023-11-14");
    assert_eq!(source["claims"][0]["txHash"], "0xc1");
    assert_eq!(source["holdings"][0]["index"], 1);
    assert_eq!(source["unclaimedRows"][0]["amount"], "2000000000000000000");
}

#[tokio::test]
async fn portfolio_is_cached_until_refreshed() {
    let h = harness().await;
    let url = format!("{}/api/claims/{}", h.api, WALLET);

    get_json(&url).await;
    get_json(&url).await;
    assert_eq!(h.indexer.requested_blocks().len(), 1);

    let resp = reqwest::Client::new()
        .post(format!("{url}/refresh"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["totalEarned"], "3000000000000000000");
    assert_eq!(h.indexer.requested_blocks().len(), 2);
}

#[tokio::test]
async fn invalid_owner_is_rejected() {
    let h = harness().await;
    let (status, _) = get_json(&format!("{}/api/claims/0xWALLET", h.api)).await;
    assert_eq!(status, 400);
    let (status, _) = get_json(&format!("{}/api/claims/0x1234/sources/permian-1", h.api)).await;
    assert_eq!(status, 400);
}

#[tokio::test]
async fn unknown_source_is_not_found() {
    let h = harness().await;
    let (status, _) =
        get_json(&format!("{}/api/claims/{}/sources/nowhere", h.api, WALLET)).await;
    assert_eq!(status, 404);
    let (status, _) =
        get_json(&format!("{}/api/claims/{}/sources/nowhere/proofs", h.api, WALLET)).await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn single_source_claims() {
    let h = harness().await;
    let (status, body) =
        get_json(&format!("{}/api/claims/{}/sources/permian-1", h.api, OTHER_WALLET)).await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["claimedRows"].as_array().unwrap().len(), 0);
    assert_eq!(body["totalUnclaimedAmount"], "5000000000000000000");
    assert_eq!(body["holdings"][0]["unclaimedAmount"], "5.0");
}

#[tokio::test]
async fn proofs_verify_against_anchored_root() {
    let h = harness().await;
    let (status, body) = get_json(&format!(
        "{}/api/claims/{}/sources/permian-1/proofs",
        h.api, WALLET
    ))
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["source"], "permian-1");
    assert_eq!(body["ownerAddress"], WALLET);

    let proofs = body["proofs"].as_array().unwrap();
    assert_eq!(proofs.len(), 1);
    assert_eq!(proofs[0]["index"], 1);
    assert_eq!(proofs[0]["amount"], "2000000000000000000");

    let root = parse_hash(&h.merkle_root).unwrap();
    let leaf = row_leaf(&manifest_rows()[1]);
    assert_eq!(
        parse_hash(proofs[0]["leafValue"].as_str().unwrap()),
        Some(leaf)
    );
    let path: Vec<[u8; 32]> = proofs[0]["proof"]
        .as_array()
        .unwrap()
        .iter()
        .map(|h| parse_hash(h.as_str().unwrap()).unwrap())
        .collect();
    assert!(verify_proof(&root, &leaf, &path));
}

#[tokio::test]
async fn unverifiable_manifest_yields_no_manifest_status() {
    let rows = manifest_rows();
    let gateway = spawn_gateway(manifest_csv(&rows)).await;
    let indexer = MockIndexer::default();
    let indexer_url = indexer.spawn().await;
    let tampered_root = format!("0x{}", "ab".repeat(32));

    let state = build_state(
        vec![source(&gateway, &indexer_url, &tampered_root)],
        format!("{indexer_url}/query"),
        Duration::from_secs(60),
    );
    let api = spawn(build_router(state)).await;

    let (status, body) = get_json(&format!("{api}/api/claims/{WALLET}")).await;
    assert_eq!(status, 200);
    assert_eq!(body["sources"][0]["status"], "no_manifest");
    assert!(body["sources"][0]["error"]
        .as_str()
        .unwrap()
        .contains("merkle root mismatch"));
    assert_eq!(body["totalEarned"], "0");

    let (status, _) =
        get_json(&format!("{api}/api/claims/{WALLET}/sources/permian-1/proofs")).await;
    assert_eq!(status, 502);
}

#[tokio::test]
async fn source_refresh_refetches_manifest() {
    let rows = manifest_rows();
    let merkle_root = root_of(&rows);
    let (gateway, hits) = spawn_counting_gateway(manifest_csv(&rows)).await;
    let indexer = MockIndexer::new(HashMap::from([(100, indexer_page(&[], vec![], None))]));
    let indexer_url = indexer.spawn().await;

    let state = build_state(
        vec![source(&gateway, &indexer_url, &merkle_root)],
        format!("{indexer_url}/query"),
        Duration::from_secs(60),
    );
    let api = spawn(build_router(state)).await;
    let url = format!("{api}/api/claims/{WALLET}/sources/permian-1");

    // Reachability check plus body fetch, then served from cache.
    get_json(&url).await;
    get_json(&url).await;
    assert_eq!(hits.load(Ordering::SeqCst), 2);

    let resp = reqwest::Client::new()
        .post(format!("{url}/refresh"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["totalUnclaimedAmount"], "3000000000000000000");
    assert_eq!(hits.load(Ordering::SeqCst), 4);

    let resp = reqwest::Client::new()
        .post(format!("{api}/api/claims/{WALLET}/sources/nowhere/refresh"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 404);
}
