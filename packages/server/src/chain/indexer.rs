//! Client for the block-range paginated log indexer.
//!
//! Each query returns the logs from `from_block` up to whatever range the
//! indexer chose to scan, plus a `next_block` cursor to resume from.

use std::collections::HashMap;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use royalty_claims_core::{decode_claim_event, ClaimEvent};

use super::pagination::{collect_pages, Collected, Page};

/// A raw claim log with its block timestamp attached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexedLog {
    pub block_number: u64,
    pub transaction_hash: String,
    pub data: String,
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic0: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

/// Parameters of one claim-log scan.
#[derive(Debug, Clone, Copy)]
pub struct LogQuery<'a> {
    pub contract_address: &'a str,
    pub event_topic: &'a str,
    pub from_block: u64,
    pub to_block: u64,
    /// Keep only logs from these transactions (case-insensitive).
    pub transaction_filter: Option<&'a [String]>,
}

#[derive(Serialize)]
struct QueryRequest<'a> {
    from_block: u64,
    logs: [LogSelection<'a>; 1],
    field_selection: FieldSelection,
}

#[derive(Serialize)]
struct LogSelection<'a> {
    address: [&'a str; 1],
    topics: [[&'a str; 1]; 1],
}

#[derive(Serialize)]
struct FieldSelection {
    block: [&'static str; 2],
    log: [&'static str; 5],
}

const FIELD_SELECTION: FieldSelection = FieldSelection {
    block: ["number", "timestamp"],
    log: [
        "block_number",
        "transaction_hash",
        "data",
        "address",
        "topic0",
    ],
};

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    data: Vec<ResponseBatch>,
    #[serde(default)]
    next_block: Option<Value>,
}

#[derive(Deserialize)]
struct ResponseBatch {
    #[serde(default)]
    blocks: Vec<RawBlock>,
    #[serde(default)]
    logs: Vec<RawLog>,
}

#[derive(Deserialize)]
struct RawBlock {
    number: Value,
    #[serde(default)]
    timestamp: Value,
}

#[derive(Deserialize)]
struct RawLog {
    block_number: Value,
    #[serde(default)]
    transaction_hash: String,
    #[serde(default)]
    data: String,
    #[serde(default)]
    address: String,
    #[serde(default)]
    topic0: Option<String>,
}

pub struct IndexerClient {
    http: reqwest::Client,
    endpoint: String,
}

impl IndexerClient {
    pub fn new(endpoint: String) -> Self {
        Self::with_http(reqwest::Client::new(), endpoint)
    }

    pub fn with_http(http: reqwest::Client, endpoint: String) -> Self {
        Self { http, endpoint }
    }

    /// Scan `query.from_block..=query.to_block` for claim logs, page by page.
    ///
    /// Best effort: a failed page ends the scan and the logs gathered so far
    /// are returned, with `interrupted` set.
    pub async fn fetch_claim_logs(&self, query: &LogQuery<'_>) -> Collected<IndexedLog> {
        let mut collected = collect_pages(query.from_block, query.to_block, |cursor| {
            self.query_page(query.contract_address, query.event_topic, cursor)
        })
        .await;

        collected
            .items
            .retain(|log| log.block_number <= query.to_block);
        if let Some(filter) = query.transaction_filter {
            collected.items.retain(|log| {
                filter
                    .iter()
                    .any(|tx| tx.trim().eq_ignore_ascii_case(&log.transaction_hash))
            });
        }

        tracing::debug!(
            endpoint = %self.endpoint,
            pages = collected.pages,
            logs = collected.items.len(),
            complete = collected.is_complete(),
            "claim log scan finished"
        );
        collected
    }

    async fn query_page(
        &self,
        contract_address: &str,
        event_topic: &str,
        from_block: u64,
    ) -> Result<Page<IndexedLog>> {
        let req = QueryRequest {
            from_block,
            logs: [LogSelection {
                address: [contract_address],
                topics: [[event_topic]],
            }],
            field_selection: FIELD_SELECTION,
        };

        let resp: QueryResponse = self
            .http
            .post(&self.endpoint)
            .json(&req)
            .send()
            .await
            .with_context(|| format!("indexer query from block {} failed", from_block))?
            .error_for_status()
            .with_context(|| format!("indexer rejected query from block {}", from_block))?
            .json()
            .await
            .context("failed to parse indexer response")?;

        Ok(page_from_response(resp))
    }
}

fn page_from_response(resp: QueryResponse) -> Page<IndexedLog> {
    let timestamps: HashMap<u64, i64> = resp
        .data
        .iter()
        .flat_map(|batch| batch.blocks.iter())
        .filter_map(|b| Some((value_as_u64(&b.number)?, value_as_i64(&b.timestamp)?)))
        .collect();

    let mut items = Vec::new();
    for raw in resp.data.into_iter().flat_map(|batch| batch.logs) {
        let Some(block_number) = value_as_u64(&raw.block_number) else {
            tracing::warn!(tx = %raw.transaction_hash, "skipping log without block number");
            continue;
        };
        items.push(IndexedLog {
            block_number,
            timestamp: timestamps.get(&block_number).copied(),
            transaction_hash: raw.transaction_hash,
            data: raw.data,
            address: raw.address,
            topic0: raw.topic0,
        });
    }

    Page {
        items,
        next_cursor: resp.next_block.as_ref().and_then(value_as_u64),
    }
}

/// Decode claim payloads, dropping logs that fail to decode.
pub fn decode_claim_logs(logs: &[IndexedLog]) -> Vec<ClaimEvent> {
    logs.iter()
        .filter_map(|log| {
            let payload = decode_claim_event(&log.data);
            if payload.is_sentinel() {
                tracing::warn!(
                    tx = %log.transaction_hash,
                    block = log.block_number,
                    "undecodable claim log skipped"
                );
                return None;
            }
            Some(ClaimEvent::new(
                log.block_number,
                &log.transaction_hash,
                log.timestamp,
                payload,
            ))
        })
        .collect()
}

/// Indexers disagree on numeric encoding: accept JSON numbers, decimal
/// strings and 0x-prefixed hex quantities.
fn value_as_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            Some(hex) => u64::from_str_radix(hex, 16).ok(),
            None => s.parse().ok(),
        },
        _ => None,
    }
}

fn value_as_i64(value: &Value) -> Option<i64> {
    value_as_u64(value).and_then(|v| i64::try_from(v).ok())
}

#[cfg(test)]
mod tests {
    use num_bigint::BigUint;
    use serde_json::json;

    use royalty_claims_core::{encode_claim_event, to_hex};

    use super::*;

    #[test]
    fn request_matches_indexer_schema() {
        let req = QueryRequest {
            from_block: 42,
            logs: [LogSelection {
                address: ["0xc0ffee"],
                topics: [["0xtopic"]],
            }],
            field_selection: FIELD_SELECTION,
        };
        let body = serde_json::to_value(&req).unwrap();
        assert_eq!(body["from_block"], 42);
        assert_eq!(body["logs"][0]["address"][0], "0xc0ffee");
        assert_eq!(body["logs"][0]["topics"][0][0], "0xtopic");
        assert_eq!(body["field_selection"]["block"][1], "timestamp");
        assert_eq!(body["field_selection"]["log"][1], "transaction_hash");
    }

    #[test]
    fn response_logs_get_block_timestamps() {
        let resp: QueryResponse = serde_json::from_value(json!({
            "data": [
                {
                    "blocks": [{"number": 10, "timestamp": "0x6553f100"}],
                    "logs": [
                        {"block_number": 10, "transaction_hash": "0xaa", "data": "0x", "address": "0xc0"},
                        {"block_number": "0xb", "transaction_hash": "0xbb", "data": "0x", "address": "0xc0"}
                    ]
                }
            ],
            "next_block": "12"
        }))
        .unwrap();

        let page = page_from_response(resp);
        assert_eq!(page.next_cursor, Some(12));
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].timestamp, Some(1_700_000_000));
        assert_eq!(page.items[1].block_number, 11);
        assert_eq!(page.items[1].timestamp, None);
    }

    #[test]
    fn empty_response_has_no_cursor() {
        let resp: QueryResponse = serde_json::from_value(json!({})).unwrap();
        let page = page_from_response(resp);
        assert!(page.items.is_empty());
        assert!(page.next_cursor.is_none());
    }

    #[test]
    fn decode_skips_sentinels() {
        let good = to_hex(&encode_claim_event(&[0x55; 20], 3, &BigUint::from(9u32)));
        let logs = vec![
            IndexedLog {
                block_number: 1,
                transaction_hash: "0xAA".into(),
                data: good,
                address: "0xc0".into(),
                topic0: None,
                timestamp: Some(5),
            },
            IndexedLog {
                block_number: 2,
                transaction_hash: "0xbb".into(),
                data: "0xdeadbeef".into(),
                address: "0xc0".into(),
                topic0: None,
                timestamp: None,
            },
        ];

        let events = decode_claim_logs(&logs);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].index, 3);
        assert_eq!(events[0].transaction_hash, "0xaa");
        assert_eq!(events[0].timestamp, Some(5));
    }

    #[test]
    fn numeric_values_in_any_encoding() {
        assert_eq!(value_as_u64(&json!(7)), Some(7));
        assert_eq!(value_as_u64(&json!("7")), Some(7));
        assert_eq!(value_as_u64(&json!("0x1f")), Some(31));
        assert_eq!(value_as_u64(&json!(null)), None);
        assert_eq!(value_as_u64(&json!(-1)), None);
    }
}
