//! Fan-out of cluster scans for one scrape.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use canalzk_coord::CoordStore;
use canalzk_monitor::{Sample, SampleSink};
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::config::ClusterDescriptor;
use crate::scanner::{ClusterScanner, ScanOutcome};

/// Per-scrape summary.
#[derive(Debug, Default)]
pub struct ScrapeReport {
    /// Outcome per cluster name.
    pub outcomes: BTreeMap<String, ScanOutcome>,
    /// Scan tasks that panicked.
    pub panicked: usize,
}

/// Runs one scan per cluster concurrently and gathers their samples.
///
/// Holds no state between scrapes; a collector is cheap to build and is
/// normally rebuilt per scrape from the current configuration.
#[derive(Clone)]
pub struct Collector {
    store: Arc<dyn CoordStore>,
    timeout: Duration,
}

impl Collector {
    /// `timeout` bounds every connect, list and read call.
    pub fn new(store: Arc<dyn CoordStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    /// Scan every cluster and return all samples once every scan has
    /// finished, successfully or not.
    pub async fn collect(&self, clusters: &[ClusterDescriptor]) -> Vec<Sample> {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sink: Arc<dyn SampleSink> = Arc::new(tx);
        self.collect_into(clusters, sink).await;

        let mut samples = Vec::new();
        while let Ok(sample) = rx.try_recv() {
            samples.push(sample);
        }
        samples
    }

    /// Scan every cluster, writing samples to `sink`. Returns after all scan
    /// tasks have completed.
    pub async fn collect_into(&self, clusters: &[ClusterDescriptor], sink: Arc<dyn SampleSink>) -> ScrapeReport {
        let started = Instant::now();
        let mut tasks = JoinSet::new();

        for cluster in clusters {
            let store = self.store.clone();
            let cluster = cluster.clone();
            let sink = sink.clone();
            let timeout = self.timeout;
            tasks.spawn(async move {
                let outcome = ClusterScanner::new(store.as_ref(), &cluster, timeout)
                    .scan(sink.as_ref())
                    .await;
                (cluster.name, outcome)
            });
        }

        let mut report = ScrapeReport::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((name, outcome)) => {
                    report.outcomes.insert(name, outcome);
                }
                Err(e) => {
                    tracing::error!(error = %e, "cluster scan task failed");
                    report.panicked += 1;
                }
            }
        }

        tracing::debug!(
            clusters = clusters.len(),
            panicked = report.panicked,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "scrape complete"
        );
        report
    }
}
