//! Metric samples produced by a scrape and their Prometheus exposition.

pub mod exposition;
pub mod sample;
pub mod sink;

pub use exposition::{render_prometheus, PROMETHEUS_CONTENT_TYPE};
pub use sample::{MetricKind, Sample};
pub use sink::{InMemorySink, SampleSink};
