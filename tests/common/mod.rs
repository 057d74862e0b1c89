//! Common test utilities for lotto-archive integration tests

use lotto_archive::Config;
use std::path::Path;
use std::time::Duration;
use wiremock::{Request, Respond, ResponseTemplate};

/// Deterministic winning numbers for a round
pub fn numbers_for(round: u32) -> [i64; 6] {
    let base = (round % 39) as i64 + 1;
    // deliberately unsorted, the fetcher must sort
    [base + 6, base, base + 3, base + 1, base + 4, base + 2]
}

/// The comma-joined form `numbers_for(round)` is archived as
pub fn archived_form(round: u32) -> String {
    let mut numbers = numbers_for(round);
    numbers.sort_unstable();
    numbers
        .iter()
        .map(|n| n.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// Serves a fixed draw history the way the real endpoint pages it
pub struct PagedHistory {
    pub latest: u32,
    pub page_size: u32,
}

impl PagedHistory {
    fn page(&self, from: u32, to: u32) -> serde_json::Value {
        let list: Vec<serde_json::Value> = (from.max(1)..=to.min(self.latest))
            .map(|round| {
                let n = numbers_for(round);
                serde_json::json!({
                    "ltEpsd": round,
                    "tm1WnNo": n[0],
                    "tm2WnNo": n[1],
                    "tm3WnNo": n[2],
                    "tm4WnNo": n[3],
                    "tm5WnNo": n[4],
                    "tm6WnNo": n[5],
                })
            })
            .collect();
        serde_json::json!({"resultCode": null, "data": {"list": list}})
    }
}

impl Respond for PagedHistory {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let param = |name: &str| {
            request
                .url
                .query_pairs()
                .find(|(k, _)| k == name)
                .and_then(|(_, v)| v.parse::<u32>().ok())
        };

        let body = if let Some(anchor) = param("srchLtEpsd") {
            let from = anchor.saturating_sub(self.page_size / 2);
            self.page(from, from + self.page_size - 1)
        } else if let Some(cursor) = param("srchCursorLtEpsd") {
            self.page(cursor + 1, cursor + self.page_size)
        } else {
            return ResponseTemplate::new(400);
        };

        ResponseTemplate::new(200).set_body_json(body)
    }
}

/// Config pointing at a mock server with no politeness delay
pub fn test_config(server_uri: &str, archive_path: &Path) -> Config {
    let mut config = Config::default();
    config.archive_path = archive_path.to_path_buf();
    config.source.url = format!("{}/draws", server_uri);
    config.source.timeout = Duration::from_secs(5);
    config.fetch.request_delay = Duration::ZERO;
    config.retry.base_delay = Duration::from_millis(10);
    config
}

/// Parse the archive file as raw strings
pub fn read_archive(path: &Path) -> Vec<String> {
    let raw = std::fs::read_to_string(path).expect("archive file should exist");
    serde_json::from_str(&raw).expect("archive file should be a JSON array of strings")
}
