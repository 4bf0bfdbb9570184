use crate::http::JsonFetcher;
use serde_json::Value;
use tracing::warn;

/// Fetches the public profile without credentials and reads `followers`.
pub async fn collect_followers(fetcher: &JsonFetcher, url: &str) -> Option<u64> {
    let body = fetcher.get_json(url, &[]).await.into_json()?;
    let followers = parse_followers(&body);
    if followers.is_none() {
        warn!(url = %url, "profile response has no numeric followers");
    }
    followers
}

pub fn parse_followers(body: &Value) -> Option<u64> {
    body.get("followers")?.as_u64()
}
