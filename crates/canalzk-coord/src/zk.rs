//! ZooKeeper backend.

use std::time::Duration;

use async_trait::async_trait;
use zookeeper_client as zk;

use crate::error::{CoordError, CoordResult};
use crate::store::{bounded, bounded_connect, CoordSession, CoordStore};

/// Connects to ZooKeeper ensembles. `endpoint` is a connect string such as
/// `10.0.0.1:2181,10.0.0.2:2181`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZkStore;

impl ZkStore {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CoordStore for ZkStore {
    async fn connect(&self, endpoint: &str, timeout: Duration) -> CoordResult<Box<dyn CoordSession>> {
        let client = bounded_connect(endpoint, timeout, zk::Client::connect(endpoint)).await?;
        tracing::debug!(endpoint, "zookeeper session established");
        Ok(Box::new(ZkSession {
            client: Some(client),
            endpoint: endpoint.to_string(),
            timeout,
        }))
    }
}

struct ZkSession {
    client: Option<zk::Client>,
    endpoint: String,
    timeout: Duration,
}

impl ZkSession {
    fn client(&self) -> CoordResult<&zk::Client> {
        self.client.as_ref().ok_or(CoordError::SessionClosed)
    }
}

fn map_err(path: &str, err: zk::Error) -> CoordError {
    match err {
        zk::Error::NoNode => CoordError::NoNode(path.to_string()),
        other => CoordError::Path {
            path: path.to_string(),
            reason: other.to_string(),
        },
    }
}

#[async_trait]
impl CoordSession for ZkSession {
    async fn list_children(&self, path: &str) -> CoordResult<Vec<String>> {
        let client = self.client()?;
        bounded("list_children", path, self.timeout, async {
            let mut children = client.list_children(path).await.map_err(|e| map_err(path, e))?;
            children.sort();
            Ok(children)
        })
        .await
    }

    async fn get_data(&self, path: &str) -> CoordResult<Vec<u8>> {
        let client = self.client()?;
        bounded("get_data", path, self.timeout, async {
            let (data, _stat) = client.get_data(path).await.map_err(|e| map_err(path, e))?;
            Ok(data)
        })
        .await
    }

    fn close(&mut self) {
        if self.client.take().is_some() {
            tracing::debug!(endpoint = %self.endpoint, "zookeeper session closed");
        }
    }
}

impl Drop for ZkSession {
    fn drop(&mut self) {
        self.close();
    }
}
