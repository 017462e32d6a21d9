use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{CoordError, CoordResult};

/// Opens read sessions against coordination-store endpoints.
#[async_trait]
pub trait CoordStore: Send + Sync {
    /// Open a session to `endpoint`. Fails with [`CoordError::Connect`] if the
    /// endpoint cannot be reached within `timeout`; the same timeout then
    /// bounds every call on the returned session.
    async fn connect(&self, endpoint: &str, timeout: Duration) -> CoordResult<Box<dyn CoordSession>>;
}

/// An open session. Dropping it releases the session.
#[async_trait]
pub trait CoordSession: Send + Sync {
    /// Names of the direct children of `path`, sorted.
    async fn list_children(&self, path: &str) -> CoordResult<Vec<String>>;

    async fn get_data(&self, path: &str) -> CoordResult<Vec<u8>>;

    /// Release the session. Idempotent; later calls fail with
    /// [`CoordError::SessionClosed`].
    fn close(&mut self);
}

/// Run `fut`, converting expiry of `timeout` into [`CoordError::Timeout`].
pub(crate) async fn bounded<T, F>(op: &'static str, path: &str, timeout: Duration, fut: F) -> CoordResult<T>
where
    F: Future<Output = CoordResult<T>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => Err(CoordError::Timeout {
            op,
            path: path.to_string(),
            after: timeout,
        }),
    }
}

/// Like [`bounded`] for the connect step, where every failure is a
/// [`CoordError::Connect`].
pub(crate) async fn bounded_connect<T, E, F>(endpoint: &str, timeout: Duration, fut: F) -> CoordResult<T>
where
    E: std::fmt::Display,
    F: Future<Output = Result<T, E>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(Ok(v)) => Ok(v),
        Ok(Err(e)) => Err(CoordError::Connect {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        }),
        Err(_) => Err(CoordError::Connect {
            endpoint: endpoint.to_string(),
            reason: format!("timed out after {:?}", timeout),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bounded_passes_result_through() {
        let r = bounded("get_data", "/a", Duration::from_secs(1), async { Ok(7) }).await;
        assert_eq!(r.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_bounded_times_out() {
        let r: CoordResult<()> = bounded(
            "list_children",
            "/a",
            Duration::from_millis(10),
            std::future::pending(),
        )
        .await;
        assert!(matches!(r, Err(CoordError::Timeout { op: "list_children", .. })));
    }

    #[tokio::test]
    async fn test_bounded_connect_maps_everything_to_connect() {
        let refused: CoordResult<()> = bounded_connect(
            "zk1:2181",
            Duration::from_secs(1),
            async { Err::<(), _>("connection refused") },
        )
        .await;
        assert!(refused.unwrap_err().is_connect());

        let stalled: CoordResult<()> = bounded_connect::<(), &str, _>(
            "zk1:2181",
            Duration::from_millis(10),
            std::future::pending(),
        )
        .await;
        let err = stalled.unwrap_err();
        assert!(err.is_connect());
        assert!(err.to_string().contains("timed out"));
    }
}
