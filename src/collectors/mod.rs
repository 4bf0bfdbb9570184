pub mod goatcounter;
pub mod profile;

use crate::config::Source;
use crate::http::JsonFetcher;
use crate::snapshot::Snapshot;
use std::time::SystemTime;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Total,
    Hits,
    Profile,
}

impl Endpoint {
    pub fn as_str(self) -> &'static str {
        match self {
            Endpoint::Total => "total",
            Endpoint::Hits => "hits",
            Endpoint::Profile => "profile",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchFailure {
    pub source: String,
    pub endpoint: Endpoint,
}

/// What happened during one collection pass, beyond what the snapshot records.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub fetched: Vec<String>,
    pub skipped: Vec<String>,
    pub failures: Vec<FetchFailure>,
}

impl RunReport {
    fn fail(&mut self, source: &str, endpoint: Endpoint) {
        self.failures.push(FetchFailure {
            source: source.to_string(),
            endpoint,
        });
    }

    pub fn failures_for(&self, endpoint: Endpoint) -> usize {
        self.failures
            .iter()
            .filter(|f| f.endpoint == endpoint)
            .count()
    }
}

/// Queries every source in order, one request at a time, then the profile.
/// Unavailable data only leaves a mark in the report.
pub async fn collect_snapshot(
    fetcher: &JsonFetcher,
    sources: &[Source],
    profile_url: Option<&str>,
    started_at: SystemTime,
) -> (Snapshot, RunReport) {
    let mut snapshot = Snapshot::new(started_at);
    let mut report = RunReport::default();

    for source in sources {
        let Some(token) = source.credential.as_deref() else {
            info!(source = %source.name, "no credential, skipping");
            report.skipped.push(source.name.clone());
            continue;
        };

        match goatcounter::collect_total(fetcher, source, token).await {
            Some(views) => snapshot.record_site_total(&source.name, views),
            None => report.fail(&source.name, Endpoint::Total),
        }

        match goatcounter::collect_daily(fetcher, source, token).await {
            Some(days) => {
                for day in &days {
                    snapshot.add_daily(&day.day, day.count);
                }
            }
            None => report.fail(&source.name, Endpoint::Hits),
        }

        report.fetched.push(source.name.clone());
    }

    if let Some(url) = profile_url {
        match profile::collect_followers(fetcher, url).await {
            Some(followers) => snapshot.set_followers(followers),
            None => report.fail("github", Endpoint::Profile),
        }
    }

    (snapshot, report)
}
