//! Per-cluster walk of the canal destination tree.

use std::time::Duration;

use canalzk_coord::{join_path, CoordSession, CoordStore};
use canalzk_monitor::{MetricKind, Sample, SampleSink};

use crate::config::ClusterDescriptor;
use crate::cursor;

/// Where canal registers destinations, relative to the cluster's chroot.
pub const DESTINATIONS_PATH: &str = "/otter/canal/destinations";
/// Directory whose children are the canal servers serving a destination.
pub const CLUSTER_NODE: &str = "cluster";
/// Ephemeral node held by the server currently running a destination.
pub const RUNNING_NODE: &str = "running";
/// Position of the client with id 1001.
pub const CURSOR_NODE: &str = "1001/cursor";

/// How far a cluster scan got.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOutcome {
    /// Connect failed; only the `up` sample was emitted.
    Unreachable,
    /// The destination list could not be read; nothing was emitted.
    ListFailed,
    /// Destinations were walked.
    Scanned { destinations: usize, excluded: usize },
}

/// Walks one cluster and emits its samples.
pub struct ClusterScanner<'a> {
    store: &'a dyn CoordStore,
    cluster: &'a ClusterDescriptor,
    timeout: Duration,
}

impl<'a> ClusterScanner<'a> {
    pub fn new(store: &'a dyn CoordStore, cluster: &'a ClusterDescriptor, timeout: Duration) -> Self {
        Self {
            store,
            cluster,
            timeout,
        }
    }

    /// Connect, list destinations, and extract each one's facts.
    ///
    /// Failures never propagate: an unreachable cluster becomes an `up`
    /// sample, an unreadable destination list ends the scan, and per
    /// destination misses become sentinel values or skipped samples.
    pub async fn scan(&self, sink: &dyn SampleSink) -> ScanOutcome {
        let cluster = &self.cluster.name;
        let endpoint = &self.cluster.endpoint;

        let mut session = match self.store.connect(endpoint, self.timeout).await {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!(%cluster, %endpoint, error = %e, "zookeeper connect failed");
                sink.emit(Sample::down(cluster.as_str(), endpoint.as_str()));
                return ScanOutcome::Unreachable;
            }
        };

        let outcome = self.scan_destinations(session.as_ref(), sink).await;
        session.close();
        outcome
    }

    async fn scan_destinations(&self, session: &dyn CoordSession, sink: &dyn SampleSink) -> ScanOutcome {
        let root = join_path(&[self.cluster.chroot.as_str(), DESTINATIONS_PATH]);

        let destinations = match session.list_children(&root).await {
            Ok(d) => d,
            Err(e) => {
                tracing::warn!(
                    cluster = %self.cluster.name,
                    path = %root,
                    error = %e,
                    "failed to list canal destinations"
                );
                return ScanOutcome::ListFailed;
            }
        };

        let mut excluded = 0;
        for destination in &destinations {
            if self.cluster.excludes(destination) {
                tracing::trace!(cluster = %self.cluster.name, %destination, "destination filtered");
                excluded += 1;
                continue;
            }
            self.scan_destination(session, &root, destination, sink).await;
        }

        ScanOutcome::Scanned {
            destinations: destinations.len() - excluded,
            excluded,
        }
    }

    /// The three reads are independent; each one's failure only affects its
    /// own sample.
    async fn scan_destination(
        &self,
        session: &dyn CoordSession,
        root: &str,
        destination: &str,
        sink: &dyn SampleSink,
    ) {
        let cluster = self.cluster.name.as_str();
        let base = join_path(&[root, destination]);
        let emit = |kind, value| sink.emit(Sample::new(kind, cluster, destination, value));

        let cluster_path = join_path(&[base.as_str(), CLUSTER_NODE]);
        let members = match session.list_children(&cluster_path).await {
            Ok(children) => children.len() as f64,
            Err(e) => {
                tracing::warn!(%cluster, %destination, path = %cluster_path, error = %e, "failed to list destination cluster");
                0.0
            }
        };
        emit(MetricKind::Cluster, members);

        // 0 = normal, 1 = abnormal.
        let running_path = join_path(&[base.as_str(), RUNNING_NODE]);
        let running = match session.get_data(&running_path).await {
            Ok(_) => 0.0,
            Err(e) if e.is_no_node() => {
                tracing::debug!(%cluster, %destination, path = %running_path, "destination not running");
                1.0
            }
            Err(e) => {
                tracing::warn!(%cluster, %destination, path = %running_path, error = %e, "failed to read running node");
                1.0
            }
        };
        emit(MetricKind::Running, running);

        let cursor_path = join_path(&[base.as_str(), CURSOR_NODE]);
        let payload = match session.get_data(&cursor_path).await {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(%cluster, %destination, path = %cursor_path, error = %e, "failed to read cursor");
                return;
            }
        };
        let record = match cursor::decode(&payload) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(%cluster, %destination, path = %cursor_path, error = %e, "failed to decode cursor");
                return;
            }
        };
        match record.lag_ms(cursor::now_ms()) {
            Some(lag) => emit(MetricKind::Timestamp, lag as f64),
            None => {
                tracing::warn!(%cluster, %destination, timestamp = record.timestamp_ms, "cursor lag out of range");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use canalzk_coord::MemStore;
    use canalzk_monitor::InMemorySink;

    const T: Duration = Duration::from_secs(1);

    fn dest(store: &MemStore, chroot: &str, name: &str) -> String {
        let base = join_path(&[chroot, DESTINATIONS_PATH, name]);
        store.create(&base, "");
        base
    }

    fn find(samples: &[Sample], kind: MetricKind, target: &str) -> Option<f64> {
        samples
            .iter()
            .find(|s| s.kind == kind && s.target == target)
            .map(|s| s.value)
    }

    #[tokio::test]
    async fn test_unreachable_emits_only_up() {
        let store = MemStore::new();
        store.refuse("zk1:2181");
        dest(&store, "/", "inst1");
        let cluster = ClusterDescriptor::new("shard1", "zk1:2181");
        let sink = InMemorySink::new();

        let outcome = ClusterScanner::new(&store, &cluster, T).scan(&sink).await;

        assert_eq!(outcome, ScanOutcome::Unreachable);
        assert_eq!(sink.take_samples(), vec![Sample::down("shard1", "zk1:2181")]);
    }

    #[tokio::test]
    async fn test_missing_destinations_root_emits_nothing() {
        let store = MemStore::new();
        store.create("/other", "");
        let cluster = ClusterDescriptor::new("shard1", "zk1:2181");
        let sink = InMemorySink::new();

        let outcome = ClusterScanner::new(&store, &cluster, T).scan(&sink).await;

        assert_eq!(outcome, ScanOutcome::ListFailed);
        assert_eq!(sink.count(), 0);
        assert_eq!(store.open_sessions(), 0);
    }

    #[tokio::test]
    async fn test_healthy_destination() {
        let store = MemStore::new();
        let base = dest(&store, "/canal", "inst1");
        store.create(&format!("{}/cluster/10.0.0.1:11111", base), "");
        store.create(&format!("{}/cluster/10.0.0.2:11111", base), "");
        store.create(&format!("{}/running", base), r#"{"active":true}"#);
        let ts = cursor::now_ms() - 2_000;
        store.create(
            &format!("{}/1001/cursor", base),
            format!(r#"{{"postion":{{"timestamp":{}}}}}"#, ts),
        );
        let cluster = ClusterDescriptor::new("shard1", "zk1:2181").with_chroot("/canal");
        let sink = InMemorySink::new();

        let outcome = ClusterScanner::new(&store, &cluster, T).scan(&sink).await;
        let samples = sink.take_samples();

        assert_eq!(
            outcome,
            ScanOutcome::Scanned {
                destinations: 1,
                excluded: 0
            }
        );
        assert_eq!(samples.len(), 3);
        assert_eq!(find(&samples, MetricKind::Cluster, "inst1"), Some(2.0));
        assert_eq!(find(&samples, MetricKind::Running, "inst1"), Some(0.0));
        let lag = find(&samples, MetricKind::Timestamp, "inst1").unwrap();
        assert!((2_000.0..60_000.0).contains(&lag), "lag {}", lag);
        assert!(samples.iter().all(|s| s.cluster == "shard1"));
        assert_eq!(store.open_sessions(), 0);
    }

    #[tokio::test]
    async fn test_bare_destination_uses_sentinels() {
        let store = MemStore::new();
        dest(&store, "/", "inst1");
        let cluster = ClusterDescriptor::new("shard1", "zk1:2181");
        let sink = InMemorySink::new();

        ClusterScanner::new(&store, &cluster, T).scan(&sink).await;
        let samples = sink.take_samples();

        // No cluster dir, no running node, no cursor.
        assert_eq!(samples.len(), 2);
        assert_eq!(find(&samples, MetricKind::Cluster, "inst1"), Some(0.0));
        assert_eq!(find(&samples, MetricKind::Running, "inst1"), Some(1.0));
        assert_eq!(find(&samples, MetricKind::Timestamp, "inst1"), None);
    }

    #[tokio::test]
    async fn test_cluster_failure_does_not_block_running_or_cursor() {
        let store = MemStore::new();
        let base = dest(&store, "/", "inst1");
        store.create(&format!("{}/cluster/a", base), "");
        store.fail_path(&format!("{}/cluster", base));
        store.create(&format!("{}/running", base), "");
        store.create(&format!("{}/1001/cursor", base), r#"{"postion":{"timestamp":0}}"#);
        let cluster = ClusterDescriptor::new("shard1", "zk1:2181");
        let sink = InMemorySink::new();

        ClusterScanner::new(&store, &cluster, T).scan(&sink).await;
        let samples = sink.take_samples();

        assert_eq!(find(&samples, MetricKind::Cluster, "inst1"), Some(0.0));
        assert_eq!(find(&samples, MetricKind::Running, "inst1"), Some(0.0));
        assert!(find(&samples, MetricKind::Timestamp, "inst1").is_some());
    }

    #[tokio::test]
    async fn test_undecodable_cursor_skips_lag_only() {
        let store = MemStore::new();
        let base = dest(&store, "/", "inst1");
        store.create(&format!("{}/cluster/a", base), "");
        store.create(&format!("{}/running", base), "");
        store.create(&format!("{}/1001/cursor", base), "not json");
        let cluster = ClusterDescriptor::new("shard1", "zk1:2181");
        let sink = InMemorySink::new();

        ClusterScanner::new(&store, &cluster, T).scan(&sink).await;
        let samples = sink.take_samples();

        assert_eq!(samples.len(), 2);
        assert_eq!(find(&samples, MetricKind::Cluster, "inst1"), Some(1.0));
        assert_eq!(find(&samples, MetricKind::Running, "inst1"), Some(0.0));
    }

    #[tokio::test]
    async fn test_filter_counts_excluded() {
        let store = MemStore::new();
        for name in ["inst1", "inst2", "inst3"] {
            dest(&store, "/", name);
        }
        let cluster = ClusterDescriptor::new("shard1", "zk1:2181").with_filter(["inst2", "absent"]);
        let sink = InMemorySink::new();

        let outcome = ClusterScanner::new(&store, &cluster, T).scan(&sink).await;
        let samples = sink.take_samples();

        assert_eq!(
            outcome,
            ScanOutcome::Scanned {
                destinations: 2,
                excluded: 1
            }
        );
        assert!(samples.iter().all(|s| s.target != "inst2"));
    }
}
