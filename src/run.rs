use crate::collectors::{collect_snapshot, RunReport};
use crate::config::Config;
use crate::http::JsonFetcher;
use crate::metrics::Metrics;
use crate::output::{self, OutputError};
use crate::snapshot::Snapshot;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum RunError {
    #[error("snapshot output: {0}")]
    Output(#[from] OutputError),
    #[error("metrics encoding: {0}")]
    Metrics(#[from] prometheus::Error),
}

pub struct Runner {
    cfg: Config,
    fetcher: JsonFetcher,
    metrics: Option<Arc<Metrics>>,
}

impl Runner {
    pub fn new(cfg: Config, metrics: Option<Arc<Metrics>>) -> Self {
        let fetcher = JsonFetcher::new(
            &cfg.user_agent,
            Duration::from_millis(cfg.request_timeout_ms),
        );
        Self {
            cfg,
            fetcher,
            metrics,
        }
    }

    /// One full pass: collect, write the snapshot, then the metrics file.
    /// Only local I/O failures are returned as errors.
    pub async fn run_once(&self) -> Result<(Snapshot, RunReport), RunError> {
        let started_at = SystemTime::now();
        let sources = self.cfg.resolve_sources();
        let profile_url = self.cfg.profile.as_ref().map(|p| p.url.as_str());

        let (snapshot, report) =
            collect_snapshot(&self.fetcher, &sources, profile_url, started_at).await;

        let json = snapshot.to_pretty_json().map_err(OutputError::from)?;
        output::write_replacing(&self.cfg.output, json.as_bytes())?;

        if let (Some(metrics), Some(path)) = (&self.metrics, &self.cfg.metrics_file) {
            metrics.update_from_run(&snapshot, &report);
            output::write_replacing(path, &metrics.encode_metrics()?)?;
        }

        for failure in &report.failures {
            debug!(
                source = %failure.source,
                endpoint = failure.endpoint.as_str(),
                "no data contributed"
            );
        }
        info!(
            path = %self.cfg.output.display(),
            total_views = snapshot.total_views,
            fetched = report.fetched.len(),
            sites = snapshot.site_views.len(),
            skipped = report.skipped.len(),
            failures = report.failures.len(),
            "dashboard stats updated"
        );

        Ok((snapshot, report))
    }
}
