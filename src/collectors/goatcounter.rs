use crate::config::Source;
use crate::http::JsonFetcher;
use serde_json::Value;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyCount {
    pub day: String,
    pub count: u64,
}

fn auth_headers(token: &str) -> [(&'static str, String); 2] {
    [
        ("Authorization", format!("Bearer {token}")),
        ("Content-Type", "application/json".to_string()),
    ]
}

pub async fn collect_total(fetcher: &JsonFetcher, source: &Source, token: &str) -> Option<u64> {
    let url = format!("{}/api/v0/stats/total", source.base_url);
    let headers = auth_headers(token);
    let headers: Vec<(&str, &str)> = headers.iter().map(|(k, v)| (*k, v.as_str())).collect();

    let body = fetcher.get_json(&url, &headers).await.into_json()?;
    let views = parse_total(&body);
    if views.is_none() {
        warn!(source = %source.name, "total response has no usable count");
    }
    views
}

pub async fn collect_daily(
    fetcher: &JsonFetcher,
    source: &Source,
    token: &str,
) -> Option<Vec<DailyCount>> {
    let url = format!("{}/api/v0/stats/hits?days=7", source.base_url);
    let headers = auth_headers(token);
    let headers: Vec<(&str, &str)> = headers.iter().map(|(k, v)| (*k, v.as_str())).collect();

    let body = fetcher.get_json(&url, &headers).await.into_json()?;
    let days = parse_daily(&body);
    match &days {
        Some(days) => debug!(source = %source.name, days = days.len(), "daily counts"),
        None => warn!(source = %source.name, "hits response has no stats list"),
    }
    days
}

/// Reads `count` from a total response. GoatCounter formats it with
/// thousands separators (`"1,234"`); a plain JSON integer is accepted too.
pub fn parse_total(body: &Value) -> Option<u64> {
    match body.get("count")? {
        Value::String(s) => {
            let digits: String = s.trim().chars().filter(|c| *c != ',').collect();
            digits.parse().ok()
        }
        Value::Number(n) => n.as_u64(),
        _ => None,
    }
}

/// Reads the `stats` list of a hits response. Records without a string `day`
/// are ignored; a missing or non-integer `count` counts as zero.
pub fn parse_daily(body: &Value) -> Option<Vec<DailyCount>> {
    let stats = body.get("stats")?.as_array()?;
    Some(
        stats
            .iter()
            .filter_map(|record| {
                let day = record.get("day")?.as_str()?;
                let count = record.get("count").and_then(Value::as_u64).unwrap_or(0);
                Some(DailyCount {
                    day: day.to_string(),
                    count,
                })
            })
            .collect(),
    )
}
