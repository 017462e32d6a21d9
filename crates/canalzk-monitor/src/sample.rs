use serde::{Deserialize, Serialize};
use std::fmt;

/// Metric subsystem shared by every family, giving `<ns>_zk_<kind>`.
pub const SUBSYSTEM: &str = "zk";

/// The four metric families exported per scrape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    /// 1 when the cluster's coordination store could not be reached.
    Up,
    /// Number of members registered under the destination's `cluster` node.
    Cluster,
    /// 0 when the destination's `running` node is readable, 1 otherwise.
    Running,
    /// Replication lag in milliseconds.
    Timestamp,
}

impl MetricKind {
    pub const ALL: [MetricKind; 4] = [
        MetricKind::Up,
        MetricKind::Cluster,
        MetricKind::Running,
        MetricKind::Timestamp,
    ];

    pub fn name(self) -> &'static str {
        match self {
            MetricKind::Up => "up",
            MetricKind::Cluster => "cluster",
            MetricKind::Running => "running",
            MetricKind::Timestamp => "timestamp",
        }
    }

    pub fn help(self) -> &'static str {
        match self {
            MetricKind::Up => "canal zookeeper unreachable (1 = down)",
            MetricKind::Cluster => "canal destination cluster member count",
            MetricKind::Running => "canal destination running node state (0 = normal, 1 = abnormal)",
            MetricKind::Timestamp => "canal destination replication lag in milliseconds",
        }
    }

    /// Name of the second label: the endpoint for `up`, the destination otherwise.
    pub fn target_label(self) -> &'static str {
        match self {
            MetricKind::Up => "endpoint",
            _ => "destination",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One gauge observation labeled by cluster and endpoint-or-destination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub kind: MetricKind,
    pub cluster: String,
    pub target: String,
    pub value: f64,
}

impl Sample {
    pub fn new(
        kind: MetricKind,
        cluster: impl Into<String>,
        target: impl Into<String>,
        value: f64,
    ) -> Self {
        Self {
            kind,
            cluster: cluster.into(),
            target: target.into(),
            value,
        }
    }

    /// The cluster-unreachable sample, keyed by endpoint.
    pub fn down(cluster: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self::new(MetricKind::Up, cluster, endpoint, 1.0)
    }
}
