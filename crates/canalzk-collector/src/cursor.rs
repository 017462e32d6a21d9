//! Decoding of canal's `1001/cursor` payload.
//!
//! The payload is the JSON form of canal's `LogPosition`:
//!
//! ```json
//! {"@type":"com.alibaba.otter.canal.protocol.position.LogPosition",
//!  "identity":{"slaveId":-1,"sourceAddress":{"address":"db1","port":3306}},
//!  "postion":{"gtid":"","included":false,"journalName":"mysql-bin.000012",
//!             "position":4567,"serverId":1,"timestamp":1700000000000}}
//! ```
//!
//! Canal spells the key `postion`; the corrected spelling is accepted too.

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("invalid cursor json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("cursor has no position")]
    MissingPosition,

    #[error("cursor timestamp {0} is not a representable millisecond time")]
    Timestamp(f64),
}

/// Upstream MySQL server the cursor was read from.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SourceAddress {
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub port: i64,
}

/// The parts of a destination's cursor needed to report replication lag.
#[derive(Debug, Clone, PartialEq)]
pub struct CursorRecord {
    /// Binlog event time in milliseconds since the epoch.
    pub timestamp_ms: f64,
    pub position: Option<f64>,
    pub journal_name: Option<String>,
    pub server_id: Option<String>,
    pub gtid: Option<String>,
    pub included: bool,
    pub slave_id: Option<i64>,
    pub source: Option<SourceAddress>,
}

impl CursorRecord {
    /// Milliseconds between the cursor's event time and `now_ms`.
    ///
    /// The timestamp is truncated to whole milliseconds first. A cursor ahead
    /// of the local clock yields a negative lag; `None` if the difference
    /// does not fit in an `i64`.
    pub fn lag_ms(&self, now_ms: i64) -> Option<i64> {
        now_ms.checked_sub(self.timestamp_ms as i64)
    }
}

#[derive(Deserialize)]
struct RawCursor {
    #[serde(default)]
    identity: Option<RawIdentity>,
    #[serde(default, rename = "postion", alias = "position")]
    position: Option<RawPosition>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawIdentity {
    #[serde(default)]
    slave_id: Option<i64>,
    #[serde(default)]
    source_address: Option<SourceAddress>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPosition {
    timestamp: f64,
    #[serde(default)]
    position: Option<f64>,
    #[serde(default)]
    journal_name: Option<String>,
    // Numeric in canal's own output, a string in some re-serialised copies.
    #[serde(default)]
    server_id: Option<serde_json::Value>,
    #[serde(default)]
    gtid: Option<String>,
    #[serde(default)]
    included: bool,
}

/// Bound on accepted timestamps; anything beyond it cannot be a binlog event
/// time and would not survive conversion to `i64`.
const MAX_TIMESTAMP_MS: f64 = 9.0e18;

pub fn decode(payload: &[u8]) -> Result<CursorRecord, DecodeError> {
    let raw: RawCursor = serde_json::from_slice(payload)?;
    let pos = raw.position.ok_or(DecodeError::MissingPosition)?;
    if !pos.timestamp.is_finite() || pos.timestamp.abs() >= MAX_TIMESTAMP_MS {
        return Err(DecodeError::Timestamp(pos.timestamp));
    }
    let (slave_id, source) = match raw.identity {
        Some(id) => (id.slave_id, id.source_address),
        None => (None, None),
    };

    Ok(CursorRecord {
        timestamp_ms: pos.timestamp,
        position: pos.position,
        journal_name: pos.journal_name,
        server_id: pos.server_id.and_then(|v| match v {
            serde_json::Value::String(s) => Some(s),
            serde_json::Value::Null => None,
            other => Some(other.to_string()),
        }),
        gtid: pos.gtid.filter(|g| !g.is_empty()),
        included: pos.included,
        slave_id,
        source,
    })
}

/// Current wall-clock time in milliseconds since the epoch.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
