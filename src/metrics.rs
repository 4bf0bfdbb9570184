use crate::collectors::{Endpoint, RunReport};
use crate::snapshot::Snapshot;
use prometheus::core::Collector;
use prometheus::{opts, CounterVec, Encoder, Gauge, GaugeVec, Registry, TextEncoder};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Run metrics in Prometheus text format, meant for a node_exporter
/// textfile collector. Counters accumulate across runs of one process.
#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub sitestats_total_views: Gauge,
    pub sitestats_site_views: GaugeVec,
    pub sitestats_github_followers: Gauge,
    pub sitestats_sources_skipped: Gauge,
    pub sitestats_fetch_failures_total: CounterVec,
    pub sitestats_last_run_timestamp_seconds: Gauge,
}

impl Metrics {
    pub fn new() -> Result<Arc<Self>, prometheus::Error> {
        let registry = Registry::new();

        let sitestats_total_views = Gauge::with_opts(opts!(
            "sitestats_total_views",
            "Sum of total views across all sources"
        ))?;
        let sitestats_site_views = GaugeVec::new(
            opts!("sitestats_site_views", "Total views by source"),
            &["site"],
        )?;
        let sitestats_github_followers = Gauge::with_opts(opts!(
            "sitestats_github_followers",
            "Followers of the configured profile"
        ))?;
        let sitestats_sources_skipped = Gauge::with_opts(opts!(
            "sitestats_sources_skipped",
            "Sources skipped for lack of a credential in the last run"
        ))?;
        let sitestats_fetch_failures_total = CounterVec::new(
            opts!(
                "sitestats_fetch_failures_total",
                "Fetches that contributed no data, by endpoint"
            ),
            &["endpoint"],
        )?;
        let sitestats_last_run_timestamp_seconds = Gauge::with_opts(opts!(
            "sitestats_last_run_timestamp_seconds",
            "Unix time of the last completed run"
        ))?;

        register(&registry, &sitestats_total_views)?;
        register(&registry, &sitestats_site_views)?;
        register(&registry, &sitestats_github_followers)?;
        register(&registry, &sitestats_sources_skipped)?;
        register(&registry, &sitestats_fetch_failures_total)?;
        register(&registry, &sitestats_last_run_timestamp_seconds)?;

        Ok(Arc::new(Self {
            registry,
            sitestats_total_views,
            sitestats_site_views,
            sitestats_github_followers,
            sitestats_sources_skipped,
            sitestats_fetch_failures_total,
            sitestats_last_run_timestamp_seconds,
        }))
    }

    pub fn update_from_run(&self, snapshot: &Snapshot, report: &RunReport) {
        self.sitestats_total_views.set(snapshot.total_views as f64);

        self.sitestats_site_views.reset();
        for (site, views) in &snapshot.site_views {
            self.sitestats_site_views
                .with_label_values(&[site.as_str()])
                .set(*views as f64);
        }

        if let Some(followers) = snapshot.github_followers {
            self.sitestats_github_followers.set(followers as f64);
        }
        self.sitestats_sources_skipped
            .set(report.skipped.len() as f64);

        for endpoint in [Endpoint::Total, Endpoint::Hits, Endpoint::Profile] {
            let counter = self
                .sitestats_fetch_failures_total
                .with_label_values(&[endpoint.as_str()]);
            counter.inc_by(report.failures_for(endpoint) as f64);
        }

        self.sitestats_last_run_timestamp_seconds
            .set(now_unix() as f64);
    }

    pub fn encode_metrics(&self) -> Result<Vec<u8>, prometheus::Error> {
        let mut buf = Vec::new();
        let encoder = TextEncoder::new();
        let mf = self.registry.gather();
        encoder.encode(&mf, &mut buf)?;
        Ok(buf)
    }
}

fn register<T: Collector + Clone + 'static>(
    registry: &Registry,
    collector: &T,
) -> Result<(), prometheus::Error> {
    registry.register(Box::new(collector.clone()))
}

fn now_unix() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
