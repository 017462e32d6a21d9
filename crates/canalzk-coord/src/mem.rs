//! In-memory coordination tree with fault injection.
//!
//! All endpoints share one tree; clusters are told apart by their root path.
//! Faults are injected per endpoint (refused or stalled connects) and per
//! path (failing reads), and a global latency can be added to every session
//! call to exercise timeouts.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::error::{CoordError, CoordResult};
use crate::path::join_path;
use crate::store::{bounded, bounded_connect, CoordSession, CoordStore};

#[derive(Default)]
struct Inner {
    nodes: RwLock<BTreeMap<String, Vec<u8>>>,
    refused: RwLock<HashSet<String>>,
    stalled: RwLock<HashSet<String>>,
    failing: RwLock<HashSet<String>>,
    latency: RwLock<Option<Duration>>,
    open_sessions: AtomicUsize,
    total_sessions: AtomicUsize,
}

#[derive(Clone, Default)]
pub struct MemStore {
    inner: Arc<Inner>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or overwrite the node at `path`, creating missing ancestors
    /// with empty data.
    pub fn create(&self, path: &str, data: impl Into<Vec<u8>>) {
        let path = join_path(&[path]);
        let mut nodes = self.inner.nodes.write();
        let mut ancestor = String::new();
        for seg in path.split('/').filter(|s| !s.is_empty()) {
            ancestor.push('/');
            ancestor.push_str(seg);
            nodes.entry(ancestor.clone()).or_default();
        }
        nodes.insert(path, data.into());
    }

    /// Remove the node at `path` and everything below it.
    pub fn delete(&self, path: &str) {
        let path = join_path(&[path]);
        let prefix = format!("{}/", path);
        self.inner
            .nodes
            .write()
            .retain(|k, _| k != &path && !k.starts_with(&prefix));
    }

    /// Connects to `endpoint` fail immediately.
    pub fn refuse(&self, endpoint: &str) {
        self.inner.refused.write().insert(endpoint.to_string());
    }

    /// Connects to `endpoint` never complete.
    pub fn stall(&self, endpoint: &str) {
        self.inner.stalled.write().insert(endpoint.to_string());
    }

    /// Reads of `path` fail with a non-`NoNode` error.
    pub fn fail_path(&self, path: &str) {
        self.inner.failing.write().insert(join_path(&[path]));
    }

    /// Delay applied to every session call.
    pub fn set_latency(&self, latency: Option<Duration>) {
        *self.inner.latency.write() = latency;
    }

    /// Sessions opened and not yet closed.
    pub fn open_sessions(&self) -> usize {
        self.inner.open_sessions.load(Ordering::SeqCst)
    }

    /// Sessions opened since creation.
    pub fn total_sessions(&self) -> usize {
        self.inner.total_sessions.load(Ordering::SeqCst)
    }
}

impl Inner {
    async fn delay(&self) {
        let latency = *self.latency.read();
        if let Some(d) = latency {
            tokio::time::sleep(d).await;
        }
    }

    fn check_readable(&self, path: &str) -> CoordResult<()> {
        if self.failing.read().contains(path) {
            return Err(CoordError::Path {
                path: path.to_string(),
                reason: "injected failure".into(),
            });
        }
        Ok(())
    }

    fn children(&self, path: &str) -> CoordResult<Vec<String>> {
        self.check_readable(path)?;
        let nodes = self.nodes.read();
        if path != "/" && !nodes.contains_key(path) {
            return Err(CoordError::NoNode(path.to_string()));
        }
        let prefix = if path == "/" {
            "/".to_string()
        } else {
            format!("{}/", path)
        };
        let names: BTreeSet<String> = nodes
            .range(prefix.clone()..)
            .take_while(|(k, _)| k.starts_with(&prefix))
            .filter_map(|(k, _)| {
                let rest = &k[prefix.len()..];
                (!rest.is_empty() && !rest.contains('/')).then(|| rest.to_string())
            })
            .collect();
        Ok(names.into_iter().collect())
    }

    fn data(&self, path: &str) -> CoordResult<Vec<u8>> {
        self.check_readable(path)?;
        self.nodes
            .read()
            .get(path)
            .cloned()
            .ok_or_else(|| CoordError::NoNode(path.to_string()))
    }
}

#[async_trait]
impl CoordStore for MemStore {
    async fn connect(&self, endpoint: &str, timeout: Duration) -> CoordResult<Box<dyn CoordSession>> {
        let refused = self.inner.refused.read().contains(endpoint);
        let stalled = self.inner.stalled.read().contains(endpoint);

        bounded_connect(endpoint, timeout, async {
            if stalled {
                std::future::pending::<()>().await;
            }
            if refused {
                return Err("connection refused");
            }
            Ok(())
        })
        .await?;

        self.inner.open_sessions.fetch_add(1, Ordering::SeqCst);
        self.inner.total_sessions.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemSession {
            inner: self.inner.clone(),
            timeout,
            closed: false,
        }))
    }
}

struct MemSession {
    inner: Arc<Inner>,
    timeout: Duration,
    closed: bool,
}

impl MemSession {
    fn ensure_open(&self) -> CoordResult<()> {
        if self.closed {
            Err(CoordError::SessionClosed)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl CoordSession for MemSession {
    async fn list_children(&self, path: &str) -> CoordResult<Vec<String>> {
        self.ensure_open()?;
        let path = join_path(&[path]);
        bounded("list_children", &path, self.timeout, async {
            self.inner.delay().await;
            self.inner.children(&path)
        })
        .await
    }

    async fn get_data(&self, path: &str) -> CoordResult<Vec<u8>> {
        self.ensure_open()?;
        let path = join_path(&[path]);
        bounded("get_data", &path, self.timeout, async {
            self.inner.delay().await;
            self.inner.data(&path)
        })
        .await
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.inner.open_sessions.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

impl Drop for MemSession {
    fn drop(&mut self) {
        self.close();
    }
}
