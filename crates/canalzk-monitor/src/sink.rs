//! Destinations for samples emitted during a scrape.
//!
//! A sink may be written from several scan tasks at once; every `emit`
//! hands over one whole sample.

use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::sample::Sample;

pub trait SampleSink: Send + Sync {
    fn emit(&self, sample: Sample);
}

impl SampleSink for mpsc::UnboundedSender<Sample> {
    fn emit(&self, sample: Sample) {
        // The receiver only goes away once the scrape is abandoned.
        let _ = self.send(sample);
    }
}

/// Collects samples in memory.
#[derive(Default)]
pub struct InMemorySink {
    samples: Mutex<Vec<Sample>>,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take all stored samples, leaving the internal buffer empty.
    pub fn take_samples(&self) -> Vec<Sample> {
        std::mem::take(&mut *self.samples.lock())
    }

    pub fn count(&self) -> usize {
        self.samples.lock().len()
    }
}

impl SampleSink for InMemorySink {
    fn emit(&self, sample: Sample) {
        self.samples.lock().push(sample);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::MetricKind;
    use std::sync::Arc;

    #[test]
    fn test_in_memory_sink() {
        let sink = InMemorySink::new();
        sink.emit(Sample::down("a", "h:1"));
        sink.emit(Sample::new(MetricKind::Running, "a", "d", 0.0));
        assert_eq!(sink.count(), 2);

        let taken = sink.take_samples();
        assert_eq!(taken.len(), 2);
        assert_eq!(sink.count(), 0);
    }

    #[test]
    fn test_concurrent_writers() {
        let sink = Arc::new(InMemorySink::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let sink = sink.clone();
                std::thread::spawn(move || {
                    for j in 0..100 {
                        sink.emit(Sample::new(
                            MetricKind::Cluster,
                            format!("c{}", i),
                            format!("d{}", j),
                            i as f64,
                        ));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let samples = sink.take_samples();
        assert_eq!(samples.len(), 800);
        // Fields of a single sample are never mixed across writers.
        assert!(samples
            .iter()
            .all(|s| s.cluster == format!("c{}", s.value as usize)));
    }

    #[tokio::test]
    async fn test_channel_sink() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        tx.emit(Sample::down("a", "h:1"));
        drop(tx);
        assert_eq!(rx.recv().await, Some(Sample::down("a", "h:1")));
        assert_eq!(rx.recv().await, None);
    }
}
