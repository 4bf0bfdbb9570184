use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::SystemTime;

/// The dashboard record written to the site's data directory.
///
/// Maps are ordered so the file is byte-stable for identical upstream data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub total_views: u64,
    pub site_views: BTreeMap<String, u64>,
    pub last_updated: String,
    pub chart_data: BTreeMap<String, u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_followers: Option<u64>,
}

impl Snapshot {
    pub fn new(started_at: SystemTime) -> Self {
        Self {
            last_updated: humantime::format_rfc3339_millis(started_at).to_string(),
            ..Self::default()
        }
    }

    pub fn record_site_total(&mut self, site: &str, views: u64) {
        self.site_views.insert(site.to_string(), views);
        self.total_views = self.total_views.saturating_add(views);
    }

    pub fn add_daily(&mut self, day: &str, views: u64) {
        let slot = self.chart_data.entry(day.to_string()).or_insert(0);
        *slot = slot.saturating_add(views);
    }

    pub fn set_followers(&mut self, followers: u64) {
        self.github_followers = Some(followers);
    }

    pub fn to_pretty_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
