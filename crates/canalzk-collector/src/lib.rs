//! Scrape-time collection of canal destination state from ZooKeeper.
//!
//! Canal records each destination under
//! `<chroot>/otter/canal/destinations/<destination>`:
//!
//! - `cluster/*`: one child per canal server registered for the destination.
//! - `running`: present while a server is actively running the destination.
//! - `1001/cursor`: JSON log position of the client with id 1001.
//!
//! Every scrape connects to each configured cluster concurrently, walks that
//! layout and emits `cluster`, `running` and `timestamp` (lag) samples per
//! destination, or a single `up` sample when the cluster is unreachable.
//! Nothing is kept between scrapes.

pub mod collector;
pub mod config;
pub mod cursor;
pub mod scanner;

pub use collector::{Collector, ScrapeReport};
pub use config::{ClusterDescriptor, ExporterConfig, WebConfig, ZkConfig};
pub use cursor::{CursorRecord, DecodeError};
pub use scanner::{ClusterScanner, ScanOutcome};
