//! Prometheus text exposition of one scrape's samples.
//!
//! A fresh registry is built for every scrape so that series from destinations
//! that disappeared never linger.

use prometheus::{Encoder, Gauge, GaugeVec, Opts, Registry, TextEncoder};

use crate::sample::{MetricKind, Sample, SUBSYSTEM};

/// Content type for the Prometheus text format.
pub const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Label carrying the cluster (configuration section) name.
pub const CLUSTER_LABEL: &str = "cluster";

pub fn render_prometheus(namespace: &str, samples: &[Sample]) -> prometheus::Result<String> {
    let registry = Registry::new();

    let families = MetricKind::ALL
        .iter()
        .map(|&kind| {
            let gauge = GaugeVec::new(
                Opts::new(kind.name(), kind.help())
                    .namespace(namespace)
                    .subsystem(SUBSYSTEM),
                &[CLUSTER_LABEL, kind.target_label()],
            )?;
            registry.register(Box::new(gauge.clone()))?;
            Ok(gauge)
        })
        .collect::<prometheus::Result<Vec<_>>>()?;

    let build_info = Gauge::with_opts(
        Opts::new("exporter_build_info", "canal zk exporter build information")
            .namespace(namespace)
            .subsystem(SUBSYSTEM)
            .const_label("version", env!("CARGO_PKG_VERSION")),
    )?;
    build_info.set(1.0);
    registry.register(Box::new(build_info))?;

    for sample in samples {
        let family = &families[family_index(sample.kind)];
        family
            .with_label_values(&[sample.cluster.as_str(), sample.target.as_str()])
            .set(sample.value);
    }

    let mut buf = Vec::new();
    TextEncoder::new().encode(&registry.gather(), &mut buf)?;
    String::from_utf8(buf).map_err(|e| prometheus::Error::Msg(e.to_string()))
}

fn family_index(kind: MetricKind) -> usize {
    match kind {
        MetricKind::Up => 0,
        MetricKind::Cluster => 1,
        MetricKind::Running => 2,
        MetricKind::Timestamp => 3,
    }
}
